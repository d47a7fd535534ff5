//! Error types for the service registry

use thiserror::Error;

/// Service registry error type
#[derive(Error, Debug)]
pub enum Error {
    /// Service not found
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Malformed input at the registry boundary
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport failure while talking to a remote registry
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote registry answered with a status the client does not expect
    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::ServiceNotFound(_) => "not_found",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Http(_) | Error::UnexpectedStatus { .. } => "upstream_error",
            Error::Io(_) | Error::Json(_) | Error::Yaml(_) => "internal_error",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
