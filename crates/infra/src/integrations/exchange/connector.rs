//! National exchange gateway facade.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use medcode_core::{Clock, EventBus};
use medcode_domain::config::ExchangeConfig;
use medcode_domain::constants::{EXCHANGE_SCOPE, FHIR_CONTENT_TYPE};
use medcode_domain::Result;
use serde_json::Value;
use tracing::info;

use super::billing::{BillingService, ClaimResult, ClaimStatus, ClaimSubmission};
use super::clinical::{ClinicalService, ClinicalSubmission, ClinicalSubmissionResult};
use super::education::{
    create_practice_case, validate_student_submission, PracticeCase, PracticeScenario,
    StudentSubmission, SubmissionReview,
};
use super::eligibility::{
    EligibilityPatient, EligibilityResult, EligibilityService, PreauthorizationRequest,
};
use super::validation::{ResourceValidation, ValidationService};
use crate::connector::{
    AccessTokenProvider, AuthScheme, ConnectorEvent, CredentialConfig, CredentialManager,
    ExecutorConfig, RequestExecutor,
};

pub const PLATFORM: &str = "NPHIES";

pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Session with the national exchange. Request ids and timestamps come from
/// the injected clock.
pub struct ExchangeConnector {
    credentials: Arc<CredentialManager>,
    events: EventBus<ConnectorEvent>,
    clock: Arc<dyn Clock>,
    eligibility: EligibilityService,
    clinical: ClinicalService,
    billing: BillingService,
    validation: ValidationService,
}

impl ExchangeConnector {
    pub fn new(config: &ExchangeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_backoff(config, clock, DEFAULT_BASE_BACKOFF)
    }

    pub fn with_backoff(
        config: &ExchangeConfig,
        clock: Arc<dyn Clock>,
        base_backoff: Duration,
    ) -> Result<Self> {
        let base_url = config.active_base_url().trim_end_matches('/').to_string();
        let events = EventBus::new();

        let credentials = Arc::new(CredentialManager::new(
            CredentialConfig {
                platform: PLATFORM.to_string(),
                token_url: format!("{base_url}/auth/token"),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scope: Some(EXCHANGE_SCOPE.to_string()),
                scheme: AuthScheme::FormCredentials,
                timeout: config.timeout(),
            },
            Arc::clone(&clock),
            events.clone(),
        )?);

        let executor_config = ExecutorConfig::new(PLATFORM, base_url.as_str())
            .timeout(config.timeout())
            .max_attempts(config.retry_attempts as usize)
            .base_backoff(base_backoff)
            .header("Content-Type", FHIR_CONTENT_TYPE)
            .header("Accept", FHIR_CONTENT_TYPE)
            .header("X-NPHIES-Version", config.fhir_version.as_str());

        let auth: Arc<dyn AccessTokenProvider> = credentials.clone();
        let executor = Arc::new(RequestExecutor::new(executor_config, auth, events.clone())?);

        info!(
            base_url = %base_url,
            fhir_version = %config.fhir_version,
            "exchange connector configured"
        );

        Ok(Self {
            credentials,
            events,
            clock,
            eligibility: EligibilityService::new(Arc::clone(&executor)),
            clinical: ClinicalService::new(Arc::clone(&executor)),
            billing: BillingService::new(Arc::clone(&executor)),
            validation: ValidationService::new(executor),
        })
    }

    pub fn events(&self) -> &EventBus<ConnectorEvent> {
        &self.events
    }

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

    pub fn eligibility(&self) -> &EligibilityService {
        &self.eligibility
    }

    pub fn clinical(&self) -> &ClinicalService {
        &self.clinical
    }

    pub fn billing(&self) -> &BillingService {
        &self.billing
    }

    pub fn validation(&self) -> &ValidationService {
        &self.validation
    }

    pub async fn check_eligibility(
        &self,
        patient: &EligibilityPatient,
    ) -> Result<EligibilityResult> {
        self.eligibility.check_eligibility(patient, self.clock.now()).await
    }

    pub async fn submit_preauthorization(
        &self,
        request: &PreauthorizationRequest,
    ) -> Result<Value> {
        self.eligibility.submit_preauthorization(request, self.clock.now()).await
    }

    pub async fn submit_clinical_data(
        &self,
        submission: &ClinicalSubmission,
    ) -> Result<ClinicalSubmissionResult> {
        self.clinical.submit_clinical_data(submission, self.clock.now()).await
    }

    pub async fn submit_claim(&self, claim: &ClaimSubmission) -> Result<ClaimResult> {
        self.billing.submit_claim(claim, self.clock.now()).await
    }

    pub async fn claim_status(&self, claim_id: &str) -> Result<ClaimStatus> {
        self.billing.claim_status(claim_id).await
    }

    pub async fn validate_resource(
        &self,
        resource: &Value,
        resource_type: &str,
    ) -> Result<ResourceValidation> {
        self.validation.validate_resource(resource, resource_type).await
    }

    pub async fn create_practice_case(&self, scenario: &PracticeScenario) -> Result<PracticeCase> {
        create_practice_case(&self.validation, scenario, self.clock.now()).await
    }

    /// Local check only; no request is sent.
    pub fn validate_student_submission(&self, submission: &StudentSubmission) -> SubmissionReview {
        validate_student_submission(submission)
    }
}
