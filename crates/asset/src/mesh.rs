//! CPU-side mesh representation used by loaders.

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: [f32::INFINITY; 3],
        max: [f32::NEG_INFINITY; 3],
    };

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn include(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn union(mut self, other: &Aabb) -> Aabb {
        if !other.is_empty() {
            self.include(other.min);
            self.include(other.max);
        }
        self
    }

    pub fn center(&self) -> [f32; 3] {
        std::array::from_fn(|i| 0.5 * (self.min[i] + self.max[i]))
    }

    pub fn size(&self) -> [f32; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        std::array::from_fn(|i| self.max[i] - self.min[i])
    }

    pub fn max_extent(&self) -> f32 {
        let [x, y, z] = self.size();
        x.max(y).max(z)
    }
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        let mut bb = Aabb::EMPTY;
        for v in &self.vertices {
            bb.include(v.position);
        }
        bb
    }

    /// Center on `center` and scale uniformly by `scale`. Normals are unaffected.
    pub fn recenter_and_scale(&mut self, center: [f32; 3], scale: f32) {
        for v in &mut self.vertices {
            for i in 0..3 {
                v.position[i] = (v.position[i] - center[i]) * scale;
            }
        }
    }
}

/// Center `meshes` on their common bounding-box center and scale them so the
/// largest extent equals `target_size`. Degenerate (flat or empty) input is
/// only recentered.
pub fn normalize_meshes<'a>(meshes: impl IntoIterator<Item = &'a mut MeshData>, target_size: f32) {
    let meshes: Vec<&mut MeshData> = meshes.into_iter().collect();
    let bounds = meshes
        .iter()
        .fold(Aabb::EMPTY, |acc, m| acc.union(&m.bounds()));
    if bounds.is_empty() {
        return;
    }
    let extent = bounds.max_extent();
    let scale = if extent > 1e-9 { target_size / extent } else { 1.0 };
    let center = bounds.center();
    for mesh in meshes {
        mesh.recenter_and_scale(center, scale);
    }
}

/// Unit normal of triangle (a, b, c) with CCW winding, or zero if degenerate.
pub fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0; 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vtx(p: [f32; 3]) -> MeshVertex {
        MeshVertex::new(p, [0.0, 0.0, 1.0], [0.0, 0.0])
    }

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
        assert!(!MeshData::default().is_valid());
    }

    #[test]
    fn normalize_centers_and_fits_largest_extent() {
        let mut a = MeshData::new(vec![vtx([0.0, 0.0, 0.0]), vtx([4.0, 1.0, 0.0])], vec![0, 1, 0]);
        let mut b = MeshData::new(vec![vtx([2.0, 3.0, 2.0])], vec![0, 0, 0]);
        normalize_meshes([&mut a, &mut b], 10.0);

        let bb = a.bounds().union(&b.bounds());
        let c = bb.center();
        assert!(c.iter().all(|v| v.abs() < 1e-5));
        assert!((bb.max_extent() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn normalize_flat_mesh_only_recenters() {
        let mut m = MeshData::new(vec![vtx([1.0, 1.0, 1.0]), vtx([1.0, 1.0, 1.0])], vec![0, 1, 0]);
        normalize_meshes([&mut m], 10.0);
        assert_eq!(m.vertices[0].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn face_normal_ccw_points_up_z() {
        let n = face_normal([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(n, [0.0, 0.0, 1.0]);
        assert_eq!(face_normal([0.0; 3], [0.0; 3], [0.0; 3]), [0.0; 3]);
    }
}
