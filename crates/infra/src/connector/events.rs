//! Connector lifecycle events.

use medcode_core::Event;

/// Events published by a platform connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// A token was obtained.
    Authenticated {
        platform: String,
        token_type: Option<String>,
        expires_in: u64,
    },
    /// The token endpoint rejected the credentials or was unreachable.
    AuthError { platform: String, error: String },
    /// A domain request failed after its final attempt.
    ApiError {
        platform: String,
        endpoint: String,
        error: String,
        attempts: usize,
    },
}

impl Event for ConnectorEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AuthError { .. } => "auth_error",
            Self::ApiError { .. } => "api_error",
        }
    }
}
