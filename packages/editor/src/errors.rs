//! Error types for the editing session

use crate::form::FormError;
use crate::presenter::Operation;
use hugocms_common::CommonError;
use hugocms_gateway::{ErrorKind, GatewayError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Document path is empty")]
    EmptyPath,

    #[error("No document selected")]
    NoDocument,

    #[error("Document is not ready for editing")]
    NotReady,

    #[error("Document was created but the server returned no path to open it")]
    NotAddressable,

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Collection schema is not loaded")]
    ConfigNotLoaded,

    #[error("{operation} failed: {log}")]
    TaskFailed { operation: Operation, log: String },

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("{0}")]
    Common(String),
}

impl SessionError {
    /// Failure class of a gateway error, if this is one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::Gateway(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<CommonError> for SessionError {
    fn from(e: CommonError) -> Self {
        SessionError::Common(e.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
