//! External code validation service.

use std::sync::Arc;

use async_trait::async_trait;
use medcode_core::{CodeValidationService, CodeValidator, EventBus};
use medcode_domain::config::CodeValidatorConfig;
use medcode_domain::{CodeEntry, CodeValidation, Result, ValidationSource};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::connector::{
    AccessTokenProvider, ConnectorEvent, ExecutorConfig, RequestExecutor, StaticTokenProvider,
};

pub const PLATFORM: &str = "Code Validator";

#[derive(Debug, Deserialize)]
struct RawValidation {
    valid: bool,
    #[serde(default)]
    accuracy: f64,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    reimbursement_impact: Option<Value>,
}

impl From<RawValidation> for CodeValidation {
    fn from(raw: RawValidation) -> Self {
        Self {
            valid: raw.valid,
            accuracy: raw.accuracy,
            suggestions: raw.suggestions,
            reimbursement_impact: raw.reimbursement_impact,
            source: ValidationSource::ExternalValidation,
        }
    }
}

/// Posts each code to `{endpoint}/validate` with the API key as bearer
/// token.
pub struct RemoteCodeValidator {
    executor: RequestExecutor,
}

impl RemoteCodeValidator {
    pub fn new(config: &CodeValidatorConfig) -> Result<Self> {
        Self::with_events(config, EventBus::new())
    }

    pub fn with_events(
        config: &CodeValidatorConfig,
        events: EventBus<ConnectorEvent>,
    ) -> Result<Self> {
        let executor_config = ExecutorConfig::new(PLATFORM, config.endpoint.trim_end_matches('/'))
            .timeout(config.timeout())
            .header("Content-Type", "application/json");
        let executor = match config.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => {
                let auth: Arc<dyn AccessTokenProvider> = Arc::new(StaticTokenProvider::new(key));
                RequestExecutor::new(executor_config, auth, events)?
            }
            None => RequestExecutor::unauthenticated(executor_config, events)?,
        };
        Ok(Self { executor })
    }
}

#[async_trait]
impl CodeValidator for RemoteCodeValidator {
    async fn validate(&self, entry: &CodeEntry) -> Result<CodeValidation> {
        let response = self.executor.post_json("/validate", entry).await?;
        let raw: RawValidation = serde_json::from_value(response)?;
        Ok(raw.into())
    }
}

/// Validation service for lab sessions: remote first when enabled, the
/// internal pattern check otherwise.
pub fn code_validation_service(config: &CodeValidatorConfig) -> Result<CodeValidationService> {
    if !config.enabled {
        return Ok(CodeValidationService::internal_only());
    }
    info!(endpoint = %config.endpoint, "external code validation enabled");
    let remote: Arc<dyn CodeValidator> = Arc::new(RemoteCodeValidator::new(config)?);
    Ok(CodeValidationService::with_external(remote))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_default() {
        let raw: RawValidation = serde_json::from_value(json!({ "valid": true })).expect("raw");
        let validation = CodeValidation::from(raw);
        assert!(validation.valid);
        assert_eq!(validation.accuracy, 0.0);
        assert_eq!(validation.source, ValidationSource::ExternalValidation);
    }
}
