//! Asset loading/parsers: meshes, materials, textures and the model registry.
//! OBJ (+ MTL) and STL meshes are parsed into CPU-side [`mesh::MeshData`]
//! grouped by material; [`loader`] runs a whole model load off-thread with
//! byte-granular progress.

pub mod loader;
pub mod material;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod progress;
pub mod registry;
pub mod stl;
pub mod texture;

pub use loader::{AssetLoader, LoadHandle, LoadedModel, LoadedPart, load_model};
pub use material::Material;
pub use mesh::{Aabb, MeshData, MeshVertex};
pub use progress::{LoadProgress, SharedProgress};
pub use registry::{MeshFormat, ModelDescriptor, ModelRegistry};
