//! Remote code validation for lab sessions.

pub mod remote;

pub use remote::{code_validation_service, RemoteCodeValidator};
