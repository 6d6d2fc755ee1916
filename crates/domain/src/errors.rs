//! Error types used throughout the connectors and lab sessions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for MedCode
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MedCodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The remote platform answered with a non-success status.
    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation was attempted in a lifecycle state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MedCodeError {
    /// HTTP status of an upstream failure, if this is one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 4xx upstream answers.
    pub fn is_client_rejection(&self) -> bool {
        matches!(self.upstream_status(), Some(status) if (400..500).contains(&status))
    }
}

impl From<serde_json::Error> for MedCodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for MedCode operations
pub type Result<T> = std::result::Result<T, MedCodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_exposed_for_upstream_errors_only() {
        let err = MedCodeError::Upstream { status: 422, body: "bad".into() };
        assert_eq!(err.upstream_status(), Some(422));
        assert!(err.is_client_rejection());

        let err = MedCodeError::Upstream { status: 503, body: String::new() };
        assert!(!err.is_client_rejection());

        assert_eq!(MedCodeError::Network("down".into()).upstream_status(), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(MedCodeError::Auth("expired".into())).expect("serialize");
        assert_eq!(json["type"], "Auth");
        assert_eq!(json["message"], "expired");
    }
}
