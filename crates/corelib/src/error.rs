//! Core shared errors (renderer-agnostic).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("no initial view has been captured yet")]
    NoInitialView,
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
}

pub type CoreResult<T> = Result<T, CoreError>;
