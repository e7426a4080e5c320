use thiserror::Error;

/// Failure while encoding a payload of the shared data model
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("cannot serialize payload: {0}")]
    Json(#[from] serde_json::Error),
}
