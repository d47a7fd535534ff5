//! Error types for the relay node

use serde_json::Value;
use thiserror::Error;

/// Relay node error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input at the relay boundary
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Registry lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// No live target could be resolved
    #[error("{message}")]
    Routing {
        /// What could not be routed
        message: String,
        /// Diagnostic from the failed lookup
        details: Option<Value>,
    },

    /// Target unreachable, timed out or answered without a usable body
    #[error("{message}")]
    Upstream {
        /// Summary of the failure
        message: String,
        /// Transport diagnostic or raw response
        details: Option<Value>,
    },

    /// Well-formed error payload returned by the target
    #[error("{error}")]
    Remote {
        /// Error as reported by the target
        error: String,
        /// Details as reported by the target
        details: Option<Value>,
    },

    /// Unexpected local fault
    #[error("Internal error: {0}")]
    Internal(String),

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

    /// Create a routing error without details
    pub fn routing(message: impl Into<String>) -> Self {
        Self::Routing {
            message: message.into(),
            details: None,
        }
    }

    /// Create an upstream error carrying a diagnostic
    pub fn upstream(message: impl Into<String>, details: impl Into<Value>) -> Self {
        Self::Upstream {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Rebuild an error reported by a peer relay from its code
    pub fn from_code(code: &str, error: String, details: Option<Value>) -> Self {
        match code {
            "invalid_argument" => Self::InvalidArgument(strip_prefix(&error, "Invalid argument: ")),
            "not_found" => Self::NotFound(strip_prefix(&error, "Not found: ")),
            "routing_error" => Self::Routing {
                message: error,
                details,
            },
            "internal_error" => Self::Internal(strip_prefix(&error, "Internal error: ")),
            _ => Self::Remote { error, details },
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::Routing { .. } => "routing_error",
            Error::Upstream { .. } | Error::Remote { .. } => "upstream_error",
            Error::Internal(_) | Error::Io(_) | Error::Json(_) | Error::Yaml(_) => {
                "internal_error"
            }
        }
    }

    /// Diagnostic details, if any
    pub fn details(&self) -> Option<&Value> {
        match self {
            Error::Routing { details, .. }
            | Error::Upstream { details, .. }
            | Error::Remote { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

fn strip_prefix(message: &str, prefix: &str) -> String {
    message.strip_prefix(prefix).unwrap_or(message).to_string()
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_codes() {
        assert_eq!(Error::invalid_argument("x").code(), "invalid_argument");
        assert_eq!(Error::routing("x").code(), "routing_error");
        assert_eq!(Error::upstream("x", "timeout").code(), "upstream_error");
        assert_eq!(
            Error::Remote {
                error: "boom".into(),
                details: None
            }
            .code(),
            "upstream_error"
        );
    }

    #[test]
    fn test_from_code_round_trips_known_codes() {
        for code in ["invalid_argument", "not_found", "routing_error", "internal_error"] {
            assert_eq!(Error::from_code(code, "msg".into(), None).code(), code);
        }

        let rendered = Error::invalid_argument("empty prompt").to_string();
        let err = Error::from_code("invalid_argument", rendered.clone(), None);
        assert_eq!(err.to_string(), rendered);

        let err = Error::from_code("upstream_error", "timed out".into(), Some(json!("slow")));
        assert!(matches!(err, Error::Remote { ref error, .. } if error == "timed out"));
        assert_eq!(err.details(), Some(&json!("slow")));
    }
}
