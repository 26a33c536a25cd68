//! Error taxonomy for the pipeline registry. Reuses `BackendError` for
//! anything that crosses into the backend, plus a handful of local
//! conditions the registry itself can detect before ever calling out.

use vkr_backend::BackendError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidHandle,
    InvalidParameter,
    PoolExhausted,
    MissingShaderStage,
    RenderpassNotFound,
    Backend(BackendError),
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Error {
        Error::Backend(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
