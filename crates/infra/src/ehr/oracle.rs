//! Oracle Health sandbox.

use async_trait::async_trait;
use medcode_core::lab::{EncounterData, ScenarioPatient};
use medcode_core::{EhrConnector, EventBus, PatientCriteria};
use medcode_domain::config::EhrBackendConfig;
use medcode_domain::{EhrSystem, MedCodeError, PatientRecord, Result};
use serde_json::Value;
use tracing::{info, warn};

use super::{first_patient, patient_record};
use crate::connector::{
    endpoint_path, ConnectorEvent, ExecutorConfig, RequestExecutor, RequestOptions,
};

pub const PLATFORM: &str = "Oracle Health";
const API_KEY_HEADER: &str = "X-API-Key";

/// Authenticated by a static API key header; there is no token exchange.
pub struct OracleHealthEhr {
    executor: RequestExecutor,
    has_key: bool,
    authenticated: bool,
}

impl OracleHealthEhr {
    pub fn new(config: &EhrBackendConfig, events: EventBus<ConnectorEvent>) -> Result<Self> {
        let api_key = config.api_key.as_deref().filter(|key| !key.is_empty());
        let mut executor_config =
            ExecutorConfig::new(PLATFORM, config.endpoint.trim_end_matches('/'))
                .timeout(config.timeout())
                .header("Content-Type", "application/json");
        if let Some(key) = api_key {
            executor_config = executor_config.header(API_KEY_HEADER, key);
        }
        let executor = RequestExecutor::unauthenticated(executor_config, events)?;
        Ok(Self { executor, has_key: api_key.is_some(), authenticated: false })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn require_key(&self) -> Result<()> {
        if self.has_key {
            Ok(())
        } else {
            Err(MedCodeError::Auth(format!("{PLATFORM} API key is not configured")))
        }
    }
}

#[async_trait]
impl EhrConnector for OracleHealthEhr {
    fn system(&self) -> EhrSystem {
        EhrSystem::OracleHealth
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.authenticated = self.has_key;
        if let Err(err) = self.require_key() {
            warn!(platform = PLATFORM, "no API key configured");
            return Err(err);
        }
        info!(platform = PLATFORM, "EHR session authenticated");
        Ok(())
    }

    async fn search_patient(&mut self, criteria: &PatientCriteria) -> Result<Option<Value>> {
        self.require_key()?;
        let response = self.executor.post_json("/patients/search", criteria).await?;
        Ok(first_patient(response))
    }

    async fn load_patient(&mut self, patient: &ScenarioPatient) -> Result<PatientRecord> {
        Ok(patient_record(patient, EhrSystem::OracleHealth))
    }

    async fn get_clinical_data(&mut self, patient_id: &str, data_type: &str) -> Result<Value> {
        self.require_key()?;
        let endpoint = endpoint_path("/patients", &[patient_id, data_type])?;
        self.executor.get_json(&endpoint, RequestOptions::new()).await
    }

    async fn create_encounter(&mut self, encounter: &EncounterData) -> Result<Value> {
        self.require_key()?;
        self.executor.post_json("/encounters", encounter).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.authenticated = false;
        Ok(())
    }
}
