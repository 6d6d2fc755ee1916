//! Code validation port and the internal pattern-based validator.

use std::sync::Arc;

use async_trait::async_trait;
use medcode_domain::constants::INTERNAL_VALID_ACCURACY;
use medcode_domain::{CodeEntry, CodeValidation, Result, ValidationSource};
use tracing::warn;

use super::formats;

/// Trait for services that can judge a submitted code.
#[async_trait]
pub trait CodeValidator: Send + Sync {
    async fn validate(&self, entry: &CodeEntry) -> Result<CodeValidation>;
}

/// Offline validator that only checks the code shape for its system.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalCodeValidator;

impl InternalCodeValidator {
    pub fn check(&self, entry: &CodeEntry) -> CodeValidation {
        let valid = formats::matches_system(&entry.system, &entry.code);
        CodeValidation {
            valid,
            accuracy: if valid { INTERNAL_VALID_ACCURACY } else { 0.0 },
            suggestions: if valid {
                Vec::new()
            } else {
                vec![format!("Check {} format", entry.system)]
            },
            reimbursement_impact: None,
            source: ValidationSource::InternalValidation,
        }
    }
}

#[async_trait]
impl CodeValidator for InternalCodeValidator {
    async fn validate(&self, entry: &CodeEntry) -> Result<CodeValidation> {
        Ok(self.check(entry))
    }
}

/// Validates through an optional external service and falls back to
/// [`InternalCodeValidator`] when the service is absent or fails.
#[derive(Clone, Default)]
pub struct CodeValidationService {
    external: Option<Arc<dyn CodeValidator>>,
    internal: InternalCodeValidator,
}

impl CodeValidationService {
    pub fn internal_only() -> Self {
        Self::default()
    }

    pub fn with_external(external: Arc<dyn CodeValidator>) -> Self {
        Self { external: Some(external), internal: InternalCodeValidator }
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    pub async fn validate(&self, entry: &CodeEntry) -> CodeValidation {
        if let Some(external) = &self.external {
            match external.validate(entry).await {
                Ok(validation) => return validation,
                Err(err) => {
                    warn!(
                        code_system = %entry.system,
                        error = %err,
                        "external code validation failed; using internal validation"
                    );
                }
            }
        }
        self.internal.check(entry)
    }
}
