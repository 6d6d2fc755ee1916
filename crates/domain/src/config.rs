//! Configuration management
//!
//! Every section deserializes with defaults, so a config file only needs to
//! carry the values that differ (usually credentials).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Deployment environment that selects between production and sandbox hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    /// Parse `production` / `sandbox` (case-insensitive). Anything else is
    /// treated as sandbox.
    pub fn from_flag(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Sandbox
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub exchange: ExchangeConfig,
    pub lms: LmsConfig,
    pub ehr: EhrConfig,
    pub validator: CodeValidatorConfig,
}

/// Coding encoder / DRG platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub base_url: String,
    pub sandbox_url: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub environment: Environment,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub locale: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            base_url: constants::ENCODER_BASE_URL.to_string(),
            sandbox_url: constants::ENCODER_SANDBOX_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            api_key: String::new(),
            environment: Environment::default(),
            timeout_ms: 45_000,
            retry_attempts: 3,
            locale: constants::SAUDI_LOCALE.to_string(),
        }
    }
}

impl EncoderConfig {
    pub fn active_base_url(&self) -> &str {
        match self.environment {
            Environment::Production => &self.base_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// National health information exchange gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub production_url: String,
    pub sandbox_url: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub environment: Environment,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub fhir_version: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            production_url: constants::EXCHANGE_PRODUCTION_URL.to_string(),
            sandbox_url: constants::EXCHANGE_SANDBOX_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            environment: Environment::default(),
            timeout_ms: 30_000,
            retry_attempts: 1,
            fhir_version: constants::FHIR_VERSION.to_string(),
        }
    }
}

impl ExchangeConfig {
    pub fn active_base_url(&self) -> &str {
        match self.environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Learning management system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LmsConfig {
    pub base_url: String,
    pub api_version: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub application_key: Option<String>,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub arabic_locale: String,
    pub english_locale: String,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            base_url: constants::LMS_BASE_URL.to_string(),
            api_version: "v1".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            application_key: None,
            timeout_ms: 30_000,
            retry_attempts: 1,
            arabic_locale: "ar_SA".to_string(),
            english_locale: "en_US".to_string(),
        }
    }
}

impl LmsConfig {
    /// REST root, e.g. `https://host/learn/api/public/v1`.
    pub fn api_base_url(&self) -> String {
        format!("{}/learn/api/public/{}", self.base_url.trim_end_matches('/'), self.api_version)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Connection settings for one remote EHR sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EhrBackendConfig {
    pub endpoint: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing)]
    pub client_secret: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl EhrBackendConfig {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id: String::new(),
            client_secret: String::new(),
            api_key: None,
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Remote EHR sandboxes used by virtual lab sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EhrConfig {
    pub meditech: EhrBackendConfig,
    pub epic: EhrBackendConfig,
    pub oracle: EhrBackendConfig,
}

impl Default for EhrConfig {
    fn default() -> Self {
        Self {
            meditech: EhrBackendConfig::new(constants::MEDITECH_ENDPOINT, 30_000),
            epic: EhrBackendConfig::new(constants::EPIC_ENDPOINT, 25_000),
            oracle: EhrBackendConfig::new(constants::ORACLE_ENDPOINT, 20_000),
        }
    }
}

/// External code validation service consulted by lab sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeValidatorConfig {
    pub enabled: bool,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for CodeValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: constants::CODE_VALIDATOR_ENDPOINT.to_string(),
            api_key: None,
            timeout_ms: 15_000,
        }
    }
}

impl CodeValidatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_defaults_match_platform_contract() {
        let config = EncoderConfig::default();
        assert_eq!(config.timeout_ms, 45_000);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.locale, "en-SA");
        assert_eq!(config.active_base_url(), "https://sandbox.3mhis.com/v2");

        let production = EncoderConfig { environment: Environment::Production, ..config };
        assert_eq!(production.active_base_url(), "https://api.3mhis.com/v2");
    }

    #[test]
    fn exchange_selects_host_by_environment() {
        let mut config = ExchangeConfig::default();
        assert_eq!(config.active_base_url(), "https://sandbox.nphies.sa/api/v1");
        config.environment = Environment::Production;
        assert_eq!(config.active_base_url(), "https://api.nphies.sa/v1");
        assert_eq!(config.retry_attempts, 1);
    }

    #[test]
    fn lms_api_base_includes_public_prefix() {
        let config =
            LmsConfig { base_url: "https://lms.example.com/".into(), ..Default::default() };
        assert_eq!(config.api_base_url(), "https://lms.example.com/learn/api/public/v1");
    }

    #[test]
    fn environment_flag_parsing() {
        assert_eq!(Environment::from_flag("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::from_flag("sandbox"), Environment::Sandbox);
        assert_eq!(Environment::from_flag("staging"), Environment::Sandbox);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "encoder": { "client_id": "abc" } }"#).expect("parse");
        assert_eq!(config.encoder.client_id, "abc");
        assert_eq!(config.encoder.retry_attempts, 3);
        assert_eq!(config.ehr.epic.timeout_ms, 25_000);
        assert!(!config.validator.enabled);
    }
}
