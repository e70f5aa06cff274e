use corelib::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("no model is active")]
    NoActiveModel,
    #[error(transparent)]
    Core(#[from] CoreError),
}
