//! Model descriptors and the registry that backs the model menu.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const BUILTIN_MODELS: &str = include_str!("../data/models.json");

/// Where a model's files live and how it is first shown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    /// Mesh file (`.obj` or `.stl`), relative to the registry's base dir.
    pub path: String,
    /// Optional MTL companion for OBJ meshes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtl: Option<String>,
    pub position: [f32; 3],
    /// Euler XYZ, radians.
    #[serde(default)]
    pub rotation: [f32; 3],
    /// Initial camera eye.
    pub camera: [f32; 3],
    /// Initial orbit target.
    #[serde(default)]
    pub target: [f32; 3],
    #[serde(default)]
    pub description: String,
}

impl ModelDescriptor {
    pub fn format(&self) -> Result<MeshFormat> {
        MeshFormat::from_path(Path::new(&self.path))
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.id.trim().is_empty(), "model id must not be empty");
        anyhow::ensure!(!self.path.trim().is_empty(), "model '{}' has no mesh path", self.id);
        let vectors = [
            ("position", self.position),
            ("rotation", self.rotation),
            ("camera", self.camera),
            ("target", self.target),
        ];
        for (what, v) in vectors {
            anyhow::ensure!(
                v.iter().all(|c| c.is_finite()),
                "model '{}' has a non-finite {}",
                self.id,
                what
            );
        }
        Ok(())
    }
}

/// Mesh file formats the loader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Stl,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "stl" => Ok(MeshFormat::Stl),
            other => Err(anyhow!(
                "Unsupported model format '{}' ({})",
                other,
                path.display()
            )),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RegistryFile {
    models: Vec<ModelDescriptor>,
}

/// Ordered set of model descriptors plus the directory their paths are relative to.
#[derive(Clone, Debug)]
pub struct ModelRegistry {
    base_dir: PathBuf,
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new(base_dir: impl Into<PathBuf>, models: Vec<ModelDescriptor>) -> Result<Self> {
        anyhow::ensure!(!models.is_empty(), "model registry is empty");
        let mut seen = HashSet::new();
        for m in &models {
            m.validate()?;
            anyhow::ensure!(seen.insert(m.id.as_str()), "duplicate model id '{}'", m.id);
        }
        Ok(Self {
            base_dir: base_dir.into(),
            models,
        })
    }

    /// The shipped jaw/skull registry, resolved against the working directory.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_MODELS, ".")
    }

    pub fn from_json_str(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json).context("Invalid model registry JSON")?;
        Self::new(base_dir, file.models)
    }

    /// Load a registry file; asset paths resolve relative to its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model registry {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let registry = Self::from_json_str(&json, base)
            .with_context(|| format!("Failed to load model registry {}", path.display()))?;
        log::info!("Loaded {} model(s) from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = RegistryFile {
            models: self.models.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn first(&self) -> &ModelDescriptor {
        // Construction guarantees at least one entry.
        &self.models[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_jaw_and_skull() {
        let reg = ModelRegistry::builtin().expect("builtin registry");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.first().id, "jaw");
        let skull = reg.get("skull").expect("skull");
        assert_eq!(skull.mtl.as_deref(), Some("models/Skull.mtl"));
        assert_eq!(skull.target, [1.65, -0.48, -2.64]);
        assert!(reg.get("jaw").expect("jaw").mtl.is_none());
    }

    #[test]
    fn defaults_apply_and_paths_resolve() {
        let json = r#"{"models":[{"id":"tooth","name":"Tooth","path":"m/tooth.STL",
            "position":[0,0,0],"camera":[0,0,30]}]}"#;
        let reg = ModelRegistry::from_json_str(json, "/data").expect("parse");
        let tooth = reg.get("tooth").expect("tooth");
        assert_eq!(tooth.rotation, [0.0; 3]);
        assert_eq!(tooth.target, [0.0; 3]);
        assert_eq!(tooth.format().expect("format"), MeshFormat::Stl);
        assert_eq!(reg.resolve(&tooth.path), PathBuf::from("/data/m/tooth.STL"));
    }

    #[test]
    fn duplicate_and_empty_registries_are_rejected() {
        let dup = r#"{"models":[
            {"id":"a","name":"A","path":"a.obj","position":[0,0,0],"camera":[0,0,1]},
            {"id":"a","name":"B","path":"b.obj","position":[0,0,0],"camera":[0,0,1]}]}"#;
        assert!(ModelRegistry::from_json_str(dup, ".").is_err());
        assert!(ModelRegistry::from_json_str(r#"{"models":[]}"#, ".").is_err());
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        assert!(MeshFormat::from_path(Path::new("skull.fbx")).is_err());
        assert!(MeshFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn json_round_trip_keeps_models() {
        let reg = ModelRegistry::builtin().expect("builtin");
        let again = ModelRegistry::from_json_str(&reg.to_json().expect("json"), ".").expect("reparse");
        assert_eq!(again.get("skull"), reg.get("skull"));
    }
}
