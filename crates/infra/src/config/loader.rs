//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment when one exists
//! 2. Overlays every `MEDCODE_*` variable on the built-in defaults
//! 3. With no `MEDCODE_*` variable set, falls back to a config file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `MEDCODE_ENV`: `production` or `sandbox` for the encoder and exchange
//! - `MEDCODE_ENCODER_*`: `BASE_URL`, `SANDBOX_URL`, `CLIENT_ID`,
//!   `CLIENT_SECRET`, `API_KEY`, `TIMEOUT_MS`, `RETRY_ATTEMPTS`, `LOCALE`
//! - `MEDCODE_EXCHANGE_*`: `PRODUCTION_URL`, `SANDBOX_URL`, `CLIENT_ID`,
//!   `CLIENT_SECRET`, `TIMEOUT_MS`, `RETRY_ATTEMPTS`, `FHIR_VERSION`
//! - `MEDCODE_LMS_*`: `BASE_URL`, `API_VERSION`, `CLIENT_ID`,
//!   `CLIENT_SECRET`, `APPLICATION_KEY`, `TIMEOUT_MS`, `RETRY_ATTEMPTS`,
//!   `ARABIC_LOCALE`, `ENGLISH_LOCALE`
//! - `MEDCODE_EHR_{MEDITECH,EPIC,ORACLE}_*`: `ENDPOINT`, `CLIENT_ID`,
//!   `CLIENT_SECRET`, `API_KEY`, `TIMEOUT_MS`
//! - `MEDCODE_VALIDATOR_{ENABLED,ENDPOINT,API_KEY,TIMEOUT_MS}`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./medcode.{json,toml}` or `./config.{json,toml}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use medcode_domain::config::{EhrBackendConfig, Environment};
use medcode_domain::{Config, MedCodeError, Result};

const ENV_PREFIX: &str = "MEDCODE_";
const FILE_STEMS: [&str; 2] = ["medcode", "config"];
const EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `MedCodeError::Config` if neither the environment nor a config
/// file yields a configuration, or a value cannot be parsed.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `MEDCODE_*` environment variables
///
/// Unset variables keep their defaults.
///
/// # Errors
/// Returns `MedCodeError::Config` if no `MEDCODE_*` variable is set or a
/// numeric value is invalid.
pub fn load_from_env() -> Result<Config> {
    let mut env = EnvOverlay::default();
    let mut config = Config::default();

    if let Some(flag) = env.string("ENV") {
        let environment = Environment::from_flag(&flag);
        config.encoder.environment = environment;
        config.exchange.environment = environment;
    }

    let encoder = &mut config.encoder;
    env.set_string(&mut encoder.base_url, "ENCODER_BASE_URL");
    env.set_string(&mut encoder.sandbox_url, "ENCODER_SANDBOX_URL");
    env.set_string(&mut encoder.client_id, "ENCODER_CLIENT_ID");
    env.set_string(&mut encoder.client_secret, "ENCODER_CLIENT_SECRET");
    env.set_string(&mut encoder.api_key, "ENCODER_API_KEY");
    env.set_parsed(&mut encoder.timeout_ms, "ENCODER_TIMEOUT_MS")?;
    env.set_parsed(&mut encoder.retry_attempts, "ENCODER_RETRY_ATTEMPTS")?;
    env.set_string(&mut encoder.locale, "ENCODER_LOCALE");

    let exchange = &mut config.exchange;
    env.set_string(&mut exchange.production_url, "EXCHANGE_PRODUCTION_URL");
    env.set_string(&mut exchange.sandbox_url, "EXCHANGE_SANDBOX_URL");
    env.set_string(&mut exchange.client_id, "EXCHANGE_CLIENT_ID");
    env.set_string(&mut exchange.client_secret, "EXCHANGE_CLIENT_SECRET");
    env.set_parsed(&mut exchange.timeout_ms, "EXCHANGE_TIMEOUT_MS")?;
    env.set_parsed(&mut exchange.retry_attempts, "EXCHANGE_RETRY_ATTEMPTS")?;
    env.set_string(&mut exchange.fhir_version, "EXCHANGE_FHIR_VERSION");

    let lms = &mut config.lms;
    env.set_string(&mut lms.base_url, "LMS_BASE_URL");
    env.set_string(&mut lms.api_version, "LMS_API_VERSION");
    env.set_string(&mut lms.client_id, "LMS_CLIENT_ID");
    env.set_string(&mut lms.client_secret, "LMS_CLIENT_SECRET");
    env.set_optional(&mut lms.application_key, "LMS_APPLICATION_KEY");
    env.set_parsed(&mut lms.timeout_ms, "LMS_TIMEOUT_MS")?;
    env.set_parsed(&mut lms.retry_attempts, "LMS_RETRY_ATTEMPTS")?;
    env.set_string(&mut lms.arabic_locale, "LMS_ARABIC_LOCALE");
    env.set_string(&mut lms.english_locale, "LMS_ENGLISH_LOCALE");

    env.set_backend(&mut config.ehr.meditech, "EHR_MEDITECH")?;
    env.set_backend(&mut config.ehr.epic, "EHR_EPIC")?;
    env.set_backend(&mut config.ehr.oracle, "EHR_ORACLE")?;

    let validator = &mut config.validator;
    env.set_string(&mut validator.endpoint, "VALIDATOR_ENDPOINT");
    env.set_optional(&mut validator.api_key, "VALIDATOR_API_KEY");
    env.set_parsed(&mut validator.timeout_ms, "VALIDATOR_TIMEOUT_MS")?;
    validator.enabled = env.bool("VALIDATOR_ENABLED", validator.api_key.is_some());

    if env.found == 0 {
        return Err(MedCodeError::Config(format!("No {ENV_PREFIX}* environment variables set")));
    }
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `MedCodeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MedCodeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MedCodeError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MedCodeError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `MedCodeError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MedCodeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MedCodeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MedCodeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| candidates_in(root))
        .find(|path| path.exists())
}

fn candidates_in(root: &Path) -> Vec<PathBuf> {
    FILE_STEMS
        .iter()
        .flat_map(|stem| EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}"))))
        .collect()
}

/// Reads `MEDCODE_*` variables and counts how many were present.
#[derive(Default)]
struct EnvOverlay {
    found: usize,
}

impl EnvOverlay {
    fn string(&mut self, key: &str) -> Option<String> {
        let value = std::env::var(format!("{ENV_PREFIX}{key}")).ok()?;
        self.found += 1;
        Some(value)
    }

    fn set_string(&mut self, target: &mut String, key: &str) {
        if let Some(value) = self.string(key) {
            *target = value;
        }
    }

    fn set_optional(&mut self, target: &mut Option<String>, key: &str) {
        if let Some(value) = self.string(key) {
            *target = Some(value).filter(|v| !v.is_empty());
        }
    }

    fn set_parsed<T>(&mut self, target: &mut T, key: &str) -> Result<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.string(key) {
            *target = value.trim().parse().map_err(|e| {
                MedCodeError::Config(format!("Invalid value for {ENV_PREFIX}{key}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
    /// (case-insensitive).
    fn bool(&mut self, key: &str, default: bool) -> bool {
        self.string(key)
            .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(default)
    }

    fn set_backend(&mut self, backend: &mut EhrBackendConfig, prefix: &str) -> Result<()> {
        self.set_string(&mut backend.endpoint, &format!("{prefix}_ENDPOINT"));
        self.set_string(&mut backend.client_id, &format!("{prefix}_CLIENT_ID"));
        self.set_string(&mut backend.client_secret, &format!("{prefix}_CLIENT_SECRET"));
        self.set_optional(&mut backend.api_key, &format!("{prefix}_API_KEY"));
        self.set_parsed(&mut backend.timeout_ms, &format!("{prefix}_TIMEOUT_MS"))
    }
}
