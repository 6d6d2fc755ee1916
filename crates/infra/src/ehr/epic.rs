//! Epic FHIR sandbox.

use std::sync::Arc;

use async_trait::async_trait;
use medcode_core::lab::{EncounterData, ScenarioPatient};
use medcode_core::{Clock, EhrConnector, EventBus, PatientCriteria};
use medcode_domain::config::EhrBackendConfig;
use medcode_domain::constants::FHIR_CONTENT_TYPE;
use medcode_domain::{EhrSystem, PatientRecord, Result};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;

use super::patient_record;
use crate::connector::{
    AccessTokenProvider, AuthScheme, ConnectorEvent, CredentialConfig, CredentialManager,
    ExecutorConfig, RequestExecutor, RequestOptions,
};

pub const PLATFORM: &str = "Epic Sandbox";
const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";

/// FHIR resource holding a lab data type. Unknown types read observations.
pub fn fhir_resource_for(data_type: &str) -> &'static str {
    match data_type {
        "encounters" => "Encounter",
        "observations" => "Observation",
        "conditions" => "Condition",
        "procedures" => "Procedure",
        "medications" => "MedicationRequest",
        _ => "Observation",
    }
}

pub fn build_fhir_encounter(encounter: &EncounterData) -> Value {
    json!({
        "resourceType": "Encounter",
        "status": "finished",
        "class": {
            "system": ACT_CODE_SYSTEM,
            "code": if encounter.is_inpatient() { "IMP" } else { "AMB" },
        },
        "period": {
            "start": encounter.admission_date,
            "end": encounter.discharge_date,
        },
    })
}

/// FHIR R4 API with a form-encoded client-credentials grant.
pub struct EpicSandboxEhr {
    credentials: Arc<CredentialManager>,
    executor: RequestExecutor,
}

impl EpicSandboxEhr {
    pub fn new(
        config: &EhrBackendConfig,
        clock: Arc<dyn Clock>,
        events: EventBus<ConnectorEvent>,
    ) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/');
        let credentials = Arc::new(CredentialManager::new(
            CredentialConfig {
                platform: PLATFORM.to_string(),
                token_url: format!("{endpoint}/oauth2/token"),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scope: None,
                scheme: AuthScheme::FormCredentials,
                timeout: config.timeout(),
            },
            clock,
            events.clone(),
        )?);

        let executor_config = ExecutorConfig::new(PLATFORM, endpoint)
            .timeout(config.timeout())
            .header("Accept", FHIR_CONTENT_TYPE);
        let auth: Arc<dyn AccessTokenProvider> = credentials.clone();
        let executor = RequestExecutor::new(executor_config, auth, events)?;
        Ok(Self { credentials, executor })
    }
}

#[async_trait]
impl EhrConnector for EpicSandboxEhr {
    fn system(&self) -> EhrSystem {
        EhrSystem::EpicSandbox
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.credentials.authenticate().await?;
        info!(platform = PLATFORM, "EHR session authenticated");
        Ok(())
    }

    /// First `Patient` of the search bundle.
    async fn search_patient(&mut self, criteria: &PatientCriteria) -> Result<Option<Value>> {
        let mut options = RequestOptions::new();
        if let Some(name) = &criteria.name {
            options = options.query("name", name);
        }
        if let Some(birthdate) = &criteria.birthdate {
            options = options.query("birthdate", birthdate);
        }
        if let Some(mrn) = &criteria.mrn {
            options = options.query("identifier", mrn);
        }
        let mut bundle = self.executor.get_json("/Patient", options).await?;
        let resource = bundle
            .get_mut("entry")
            .and_then(|entry| entry.get_mut(0))
            .and_then(|first| first.get_mut("resource"))
            .map(Value::take);
        Ok(resource)
    }

    async fn load_patient(&mut self, patient: &ScenarioPatient) -> Result<PatientRecord> {
        Ok(patient_record(patient, EhrSystem::EpicSandbox))
    }

    async fn get_clinical_data(&mut self, patient_id: &str, data_type: &str) -> Result<Value> {
        let endpoint = format!("/{}", fhir_resource_for(data_type));
        self.executor.get_json(&endpoint, RequestOptions::new().query("patient", patient_id)).await
    }

    async fn create_encounter(&mut self, encounter: &EncounterData) -> Result<Value> {
        let options = RequestOptions::json(build_fhir_encounter(encounter))
            .header("Content-Type", FHIR_CONTENT_TYPE);
        self.executor.send_json(Method::POST, "/Encounter", options).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.credentials.invalidate().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_types_map_to_fhir_resources() {
        assert_eq!(fhir_resource_for("medications"), "MedicationRequest");
        assert_eq!(fhir_resource_for("conditions"), "Condition");
        assert_eq!(fhir_resource_for("vitals"), "Observation");
    }

    #[test]
    fn encounter_class_follows_encounter_type() {
        let inpatient = EncounterData {
            encounter_type: "inpatient".into(),
            admission_date: Some("2024-01-15".into()),
            discharge_date: Some("2024-01-18".into()),
            ..Default::default()
        };
        let body = build_fhir_encounter(&inpatient);
        assert_eq!(body["class"]["code"], "IMP");
        assert_eq!(body["period"]["end"], "2024-01-18");

        let outpatient =
            EncounterData { encounter_type: "outpatient".into(), ..Default::default() };
        assert_eq!(build_fhir_encounter(&outpatient)["class"]["code"], "AMB");
    }
}
