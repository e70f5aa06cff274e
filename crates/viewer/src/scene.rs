//! Scene graph: the objects the renderer draws.
//!
//! Removal queues the object's id so the renderer can free the matching GPU
//! buffers on its next sync ([`Scene::drain_released`]).

use asset::{LoadedModel, Material, MeshData};
use corelib::transform::Transform;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Clone, Debug)]
pub struct RenderPart {
    pub mesh: MeshData,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub struct SceneObject {
    pub id: ObjectId,
    pub model_id: String,
    pub name: String,
    pub transform: Transform,
    /// Multiplies every part's material opacity.
    pub opacity: f32,
    pub parts: Vec<RenderPart>,
}

impl SceneObject {
    fn from_loaded(id: ObjectId, model: LoadedModel, transform: Transform, opacity: f32) -> Self {
        Self {
            id,
            model_id: model.id,
            name: model.name,
            transform,
            opacity,
            parts: model
                .parts
                .into_iter()
                .map(|p| RenderPart {
                    mesh: p.mesh,
                    material: p.material,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    released: Vec<ObjectId>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loaded model; returns its id.
    pub fn insert(&mut self, model: LoadedModel, transform: Transform, opacity: f32) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects
            .push(SceneObject::from_loaded(id, model, transform, opacity));
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let idx = self.objects.iter().position(|o| o.id == id)?;
        let obj = self.objects.remove(idx);
        self.released.push(id);
        Some(obj)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids removed since the last call, oldest first.
    pub fn drain_released(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::{Aabb, LoadedPart, MeshVertex};

    fn model(id: &str) -> LoadedModel {
        LoadedModel {
            id: id.to_owned(),
            name: id.to_owned(),
            parts: vec![LoadedPart {
                mesh: MeshData::new(vec![MeshVertex::default(); 3], vec![0, 1, 2]),
                material: Material::default_obj(),
            }],
            bounds: Aabb::EMPTY,
        }
    }

    #[test]
    fn ids_are_never_reused() {
        let mut scene = Scene::new();
        let a = scene.insert(model("a"), Transform::identity(), 1.0);
        scene.remove(a);
        let b = scene.insert(model("b"), Transform::identity(), 1.0);
        assert_ne!(a, b);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn removal_queues_release_once() {
        let mut scene = Scene::new();
        let a = scene.insert(model("a"), Transform::identity(), 0.0);
        assert_eq!(scene.get(a).map(|o| o.parts.len()), Some(1));
        assert!(scene.remove(a).is_some());
        assert!(scene.remove(a).is_none());
        assert_eq!(scene.drain_released(), vec![a]);
        assert!(scene.drain_released().is_empty());
        assert!(scene.is_empty());
    }
}
