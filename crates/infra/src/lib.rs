//! # MedCode Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The retrying HTTP client and the shared connector plumbing
//!   (credential manager, request executor, lifecycle events)
//! - The encoder, LMS and health exchange connectors
//! - Remote EHR backends for virtual lab sessions
//! - The remote code validator
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `medcode-core`
//! - Depends on `medcode-domain` and `medcode-core`
//! - Contains all "impure" code (network and file I/O)

pub mod config;
pub mod connector;
pub mod ehr;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod validation;

// Re-export commonly used items
pub use connector::{ConnectorEvent, CredentialManager, RequestExecutor};
pub use ehr::EhrRegistry;
pub use errors::ConnectorError;
pub use integrations::{EncoderConnector, ExchangeConnector, LmsConnector};
pub use validation::{code_validation_service, RemoteCodeValidator};
