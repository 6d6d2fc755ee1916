//! # MedCode Domain
//!
//! Domain types shared by the platform connectors and the virtual lab.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Platform constants (endpoints, scopes, jurisdiction tags)
//! - Lab session and coding vocabulary
//!
//! ## Architecture
//! - No dependencies on other MedCode crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
