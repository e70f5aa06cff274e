//! Scene-state orchestration: which model is loading, which one is shown,
//! where the camera is, and what the overlays display. Window- and
//! GPU-agnostic; the platform layer feeds it input and the renderer draws
//! its [`Scene`].

pub mod config;
pub mod coords;
pub mod error;
pub mod overlay;
pub mod scene;
pub mod viewer;

pub use config::ViewerConfig;
pub use coords::{Coords, CoordsReadout};
pub use error::ViewerError;
pub use overlay::LoadingOverlay;
pub use scene::{ObjectId, Scene, SceneObject};
pub use viewer::{LoadOutcome, ModelInfo, Viewer};
