//! Error types for the gateway

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// The server refused the request (bad input, duplicate path, ...)
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// How a failure should be surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retryable; state is left intact
    TransientNetwork,
    /// Redirect to the authentication flow
    Unauthorized,
    /// Server-supplied message, no retry will help without changes
    ValidationRejected,
    NotFound,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Network(_) | GatewayError::Server { .. } | GatewayError::Decode(_) => {
                ErrorKind::TransientNetwork
            }
            GatewayError::Unauthorized => ErrorKind::Unauthorized,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Rejected { .. } => ErrorKind::ValidationRejected,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status: 400,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
