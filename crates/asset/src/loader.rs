//! Model loading: one descriptor in, one renderable [`LoadedModel`] out.
//!
//! [`load_model`] does the work synchronously; [`AssetLoader::spawn`] runs it
//! on a worker thread and hands back a [`LoadHandle`] the UI polls each frame.

use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

use anyhow::{Context, Result, anyhow};

use crate::{
    material::Material,
    mesh::{Aabb, MeshData, normalize_meshes},
    mtl::{MaterialLibrary, parse_mtl},
    obj::load_obj_from_reader,
    progress::{LoadProgress, SharedProgress, read_with_progress},
    registry::{MeshFormat, ModelDescriptor, ModelRegistry},
    stl::parse_stl,
};

/// Largest extent of an STL model after normalization, in scene units.
pub const STL_TARGET_SIZE: f32 = 10.0;

#[derive(Clone, Debug)]
pub struct LoadedPart {
    pub mesh: MeshData,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub id: String,
    pub name: String,
    pub parts: Vec<LoadedPart>,
    pub bounds: Aabb,
}

impl LoadedModel {
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

/// Load every file a descriptor names. MTL (if any) is read before the mesh.
pub fn load_model(
    desc: &ModelDescriptor,
    base_dir: &Path,
    progress: &SharedProgress,
) -> Result<LoadedModel> {
    let format = desc.format()?;
    let mesh_path = base_dir.join(&desc.path);
    let mtl_path = match (&desc.mtl, format) {
        (Some(mtl), MeshFormat::Obj) => Some(base_dir.join(mtl)),
        (Some(mtl), MeshFormat::Stl) => {
            log::warn!("Model '{}': material file {} ignored for STL", desc.id, mtl);
            None
        }
        (None, _) => None,
    };

    let total = file_size(&mesh_path)? + mtl_path.as_deref().map(file_size).transpose()?.unwrap_or(0);
    progress.begin(total);
    log::debug!("Model '{}': loading {} byte(s)", desc.id, total);

    let parts = match format {
        MeshFormat::Obj => {
            let materials = match &mtl_path {
                Some(path) => Some(load_material_library(path, progress)?),
                None => None,
            };
            load_obj_parts(&mesh_path, materials.as_ref(), progress)?
        }
        MeshFormat::Stl => {
            let bytes = read_with_progress(&mesh_path, progress)?;
            let mut mesh = parse_stl(&bytes)
                .with_context(|| format!("Failed to parse STL {}", mesh_path.display()))?;
            normalize_meshes([&mut mesh], STL_TARGET_SIZE);
            vec![LoadedPart {
                mesh,
                material: Material::default_stl(),
            }]
        }
    };

    let bounds = parts
        .iter()
        .fold(Aabb::EMPTY, |acc, p| acc.union(&p.mesh.bounds()));
    let model = LoadedModel {
        id: desc.id.clone(),
        name: desc.name.clone(),
        parts,
        bounds,
    };
    log::info!(
        "Model '{}' loaded: {} part(s), {} triangle(s)",
        model.id,
        model.parts.len(),
        model.triangle_count()
    );
    Ok(model)
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)
        .with_context(|| format!("Model file not found: {}", path.display()))?
        .len())
}

fn load_material_library(path: &Path, progress: &SharedProgress) -> Result<MaterialLibrary> {
    let bytes = read_with_progress(path, progress)?;
    let text = String::from_utf8_lossy(&bytes);
    let entries = parse_mtl(&text).with_context(|| format!("Failed to parse MTL {}", path.display()))?;
    let dir = path.parent().unwrap_or(Path::new("."));
    Ok(MaterialLibrary::from_entries(entries, dir))
}

fn load_obj_parts(
    path: &Path,
    materials: Option<&MaterialLibrary>,
    progress: &SharedProgress,
) -> Result<Vec<LoadedPart>> {
    let bytes = read_with_progress(path, progress)?;
    let model = load_obj_from_reader(std::io::Cursor::new(bytes))
        .with_context(|| format!("Failed to parse OBJ {}", path.display()))?;

    let parts = model
        .parts
        .into_iter()
        .map(|part| {
            let material = match (&part.material, materials) {
                (Some(name), Some(lib)) => lib.get(name).cloned().unwrap_or_else(|| {
                    log::warn!("Material '{}' not found in library; using default", name);
                    Material::default_obj()
                }),
                _ => Material::default_obj(),
            };
            LoadedPart {
                mesh: part.mesh,
                material,
            }
        })
        .collect();
    Ok(parts)
}

/// Spawns background loads for descriptors of one registry.
#[derive(Clone, Debug)]
pub struct AssetLoader {
    base_dir: PathBuf,
}

impl AssetLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn for_registry(registry: &ModelRegistry) -> Self {
        Self::new(registry.base_dir())
    }

    /// Start loading on a worker thread. Dropping the returned handle abandons the result.
    pub fn spawn(&self, desc: ModelDescriptor) -> LoadHandle {
        let progress = SharedProgress::new();
        let (tx, rx) = mpsc::channel();
        let model_id = desc.id.clone();

        let worker_progress = progress.clone();
        let base_dir = self.base_dir.clone();
        let spawned = thread::Builder::new()
            .name(format!("load-{}", desc.id))
            .spawn(move || {
                let result = load_model(&desc, &base_dir, &worker_progress);
                if tx.send(result).is_err() {
                    log::debug!("Load of '{}' finished after being abandoned", desc.id);
                }
            });

        let failed = match spawned {
            Ok(_) => None,
            Err(err) => Some(anyhow!("Failed to start loader thread: {err}")),
        };
        LoadHandle {
            model_id,
            progress,
            rx,
            failed,
        }
    }
}

/// In-flight load. Poll with [`LoadHandle::try_finish`].
pub struct LoadHandle {
    model_id: String,
    progress: SharedProgress,
    rx: Receiver<Result<LoadedModel>>,
    failed: Option<anyhow::Error>,
}

impl LoadHandle {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress.snapshot()
    }

    /// `None` while still running; the result exactly once otherwise.
    pub fn try_finish(&mut self) -> Option<Result<LoadedModel>> {
        if let Some(err) = self.failed.take() {
            return Some(Err(err));
        }
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(anyhow!(
                "Loader for '{}' exited without a result",
                self.model_id
            ))),
        }
    }
}
