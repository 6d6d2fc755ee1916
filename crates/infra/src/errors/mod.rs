//! Connector error taxonomy
//!
//! Classifies failures of platform calls so the request executor can decide
//! whether a retry makes sense. Converted into [`MedCodeError`] at the public
//! connector boundary.

mod conversions;

use thiserror::Error;

/// Categories of connector errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorErrorCategory {
    /// Token endpoint rejected the credentials or could not be reached
    Authentication,
    /// Connection failures and timeouts - retryable
    Transport,
    /// Non-success answer from the platform
    Upstream,
    /// Body could not be decoded
    Decode,
    /// Bad configuration or caller input - non-retryable
    Config,
}

/// Connector operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ConnectorError {
    /// Get the error category for this error
    pub fn category(&self) -> ConnectorErrorCategory {
        match self {
            Self::Auth(_) => ConnectorErrorCategory::Authentication,
            Self::Transport(_) | Self::Timeout(_) => ConnectorErrorCategory::Transport,
            Self::Upstream { .. } => ConnectorErrorCategory::Upstream,
            Self::Decode(_) => ConnectorErrorCategory::Decode,
            Self::Config(_) | Self::InvalidInput(_) => ConnectorErrorCategory::Config,
        }
    }

    /// Transport failures and 5xx answers are worth another attempt; 4xx
    /// answers and everything else are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream { status, body: body.into() }
    }
}
