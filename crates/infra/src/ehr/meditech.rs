//! Meditech Expanse sandbox.

use std::sync::Arc;

use async_trait::async_trait;
use medcode_core::lab::{EncounterData, ScenarioPatient};
use medcode_core::{Clock, EhrConnector, EventBus, PatientCriteria};
use medcode_domain::config::EhrBackendConfig;
use medcode_domain::{EhrSystem, PatientRecord, Result};
use serde_json::Value;
use tracing::info;

use super::{first_patient, patient_record};
use crate::connector::{
    endpoint_path, AccessTokenProvider, AuthScheme, ConnectorEvent, CredentialConfig,
    CredentialManager, ExecutorConfig, RequestExecutor, RequestOptions,
};

pub const PLATFORM: &str = "Meditech Expanse";
const SCOPE: &str = "patient.read encounter.write";

/// Proprietary JSON API with a JSON-body client-credentials grant.
pub struct MeditechExpanseEhr {
    credentials: Arc<CredentialManager>,
    executor: RequestExecutor,
}

impl MeditechExpanseEhr {
    pub fn new(
        config: &EhrBackendConfig,
        clock: Arc<dyn Clock>,
        events: EventBus<ConnectorEvent>,
    ) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/');
        let credentials = Arc::new(CredentialManager::new(
            CredentialConfig {
                platform: PLATFORM.to_string(),
                token_url: format!("{endpoint}/auth/token"),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scope: Some(SCOPE.to_string()),
                scheme: AuthScheme::JsonCredentials,
                timeout: config.timeout(),
            },
            clock,
            events.clone(),
        )?);

        let executor_config = ExecutorConfig::new(PLATFORM, endpoint)
            .timeout(config.timeout())
            .header("Content-Type", "application/json");
        let auth: Arc<dyn AccessTokenProvider> = credentials.clone();
        let executor = RequestExecutor::new(executor_config, auth, events)?;
        Ok(Self { credentials, executor })
    }
}

#[async_trait]
impl EhrConnector for MeditechExpanseEhr {
    fn system(&self) -> EhrSystem {
        EhrSystem::MeditechExpanse
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.credentials.authenticate().await?;
        info!(platform = PLATFORM, "EHR session authenticated");
        Ok(())
    }

    async fn search_patient(&mut self, criteria: &PatientCriteria) -> Result<Option<Value>> {
        let response = self.executor.post_json("/patients/search", criteria).await?;
        Ok(first_patient(response))
    }

    async fn load_patient(&mut self, patient: &ScenarioPatient) -> Result<PatientRecord> {
        Ok(patient_record(patient, EhrSystem::MeditechExpanse))
    }

    async fn get_clinical_data(&mut self, patient_id: &str, data_type: &str) -> Result<Value> {
        let endpoint = endpoint_path("/patients", &[patient_id, data_type])?;
        self.executor.get_json(&endpoint, RequestOptions::new()).await
    }

    async fn create_encounter(&mut self, encounter: &EncounterData) -> Result<Value> {
        self.executor.post_json("/encounters", encounter).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.credentials.invalidate().await;
        Ok(())
    }
}
