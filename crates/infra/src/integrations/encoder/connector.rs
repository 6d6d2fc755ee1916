//! Encoder platform facade.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use medcode_core::{Clock, EventBus};
use medcode_domain::config::EncoderConfig;
use medcode_domain::constants::{ENCODER_SCOPE, ENCODER_SYSTEM_NAME};
use medcode_domain::{CodeEntry, Result};
use tracing::info;

use super::assist::{AssistQuery, CodeAssistService, CodingHelp};
use super::clinical::ClinicalFinderService;
use super::coding::{CodeValidationReport, EncoderService, EncodingInput, EncodingResult};
use super::drg::{DrgInput, DrgResult, DrgService};
use super::education::EducationService;
use super::reimbursement::ReimbursementService;
use crate::connector::{
    AccessTokenProvider, AuthScheme, ConnectorEvent, CredentialConfig, CredentialManager,
    ExecutorConfig, RequestExecutor,
};
use crate::http::RetryOn;

/// Wait before the first retry; doubles for each further retry.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(2);

/// One authenticated session with the coding encoder.
///
/// Owns the token cache, the request executor and every domain service.
/// Authentication happens lazily on the first call.
pub struct EncoderConnector {
    credentials: Arc<CredentialManager>,
    events: EventBus<ConnectorEvent>,
    encoder: EncoderService,
    drg: DrgService,
    code_assist: CodeAssistService,
    clinical_finder: ClinicalFinderService,
    reimbursement: ReimbursementService,
    education: EducationService,
}

impl EncoderConnector {
    /// # Errors
    /// `Config` when the HTTP clients cannot be built.
    pub fn new(config: &EncoderConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_backoff(config, clock, DEFAULT_BASE_BACKOFF)
    }

    pub fn with_backoff(
        config: &EncoderConfig,
        clock: Arc<dyn Clock>,
        base_backoff: Duration,
    ) -> Result<Self> {
        let base_url = config.active_base_url().trim_end_matches('/').to_string();
        let events = EventBus::new();

        let credentials = Arc::new(CredentialManager::new(
            CredentialConfig {
                platform: ENCODER_SYSTEM_NAME.to_string(),
                token_url: format!("{base_url}/auth/token"),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scope: Some(ENCODER_SCOPE.to_string()),
                scheme: AuthScheme::Basic,
                timeout: config.timeout(),
            },
            clock,
            events.clone(),
        )?);

        let mut executor_config = ExecutorConfig::new(ENCODER_SYSTEM_NAME, base_url.as_str())
            .timeout(config.timeout())
            .max_attempts(config.retry_attempts as usize)
            .base_backoff(base_backoff)
            .retry_on(RetryOn::AnyFailure)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("X-3M-Locale", config.locale.as_str());
        if !config.api_key.is_empty() {
            executor_config = executor_config.header("X-3M-API-Key", config.api_key.as_str());
        }

        let auth: Arc<dyn AccessTokenProvider> = credentials.clone();
        let executor = Arc::new(RequestExecutor::new(executor_config, auth, events.clone())?);

        info!(
            base_url = %base_url,
            retry_attempts = config.retry_attempts,
            "encoder connector configured"
        );

        Ok(Self {
            credentials,
            events,
            encoder: EncoderService::new(Arc::clone(&executor)),
            drg: DrgService::new(Arc::clone(&executor)),
            code_assist: CodeAssistService::new(Arc::clone(&executor)),
            clinical_finder: ClinicalFinderService::new(Arc::clone(&executor)),
            reimbursement: ReimbursementService::new(Arc::clone(&executor)),
            education: EducationService::new(executor),
        })
    }

    /// `authenticated`, `auth_error` and `api_error` events.
    pub fn events(&self) -> &EventBus<ConnectorEvent> {
        &self.events
    }

    /// Force a token call regardless of the cached token.
    pub async fn authenticate(&self) -> Result<()> {
        self.credentials.authenticate().await?;
        Ok(())
    }

    pub async fn ensure_authenticated(&self) -> Result<()> {
        self.credentials.ensure_authenticated().await?;
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated().await
    }

    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.credentials.expires_at().await
    }

    pub fn encoder(&self) -> &EncoderService {
        &self.encoder
    }

    pub fn drg(&self) -> &DrgService {
        &self.drg
    }

    pub fn code_assist(&self) -> &CodeAssistService {
        &self.code_assist
    }

    pub fn clinical_finder(&self) -> &ClinicalFinderService {
        &self.clinical_finder
    }

    pub fn reimbursement(&self) -> &ReimbursementService {
        &self.reimbursement
    }

    pub fn education(&self) -> &EducationService {
        &self.education
    }

    pub async fn encode_record(&self, input: &EncodingInput) -> Result<EncodingResult> {
        self.encoder.encode_record(input).await
    }

    pub async fn calculate_drg(&self, input: &DrgInput) -> Result<DrgResult> {
        self.drg.calculate_ar_drg(input).await
    }

    pub async fn coding_assistance(&self, query: &AssistQuery) -> Result<CodingHelp> {
        self.code_assist.coding_help(query).await
    }

    pub async fn validate_codes(&self, codes: &[CodeEntry]) -> Result<CodeValidationReport> {
        self.encoder.validate_codes(codes).await
    }
}
