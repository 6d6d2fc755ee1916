//! Configuration loading
//!
//! Builds the typed [`medcode_domain::Config`] from environment variables
//! and JSON or TOML files.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, parse_config, probe_config_paths};
