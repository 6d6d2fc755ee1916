//! EHR backend port interfaces

use async_trait::async_trait;
use medcode_domain::{EhrSystem, PatientRecord, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::scenario::{EncounterData, ScenarioPatient};

/// Patient search criteria entered by a student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
}

impl PatientCriteria {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn by_mrn(mrn: impl Into<String>) -> Self {
        Self { mrn: Some(mrn.into()), ..Self::default() }
    }
}

/// Trait for the EHR system a lab session practices against.
///
/// Remote backends authenticate lazily, so every call takes `&mut self`.
#[async_trait]
pub trait EhrConnector: Send + Sync {
    /// Tag of this backend
    fn system(&self) -> EhrSystem;

    async fn authenticate(&mut self) -> Result<()>;

    /// First patient matching `criteria`, if any.
    async fn search_patient(&mut self, criteria: &PatientCriteria) -> Result<Option<Value>>;

    /// Make a scenario patient available in the backend.
    async fn load_patient(&mut self, patient: &ScenarioPatient) -> Result<PatientRecord>;

    async fn get_clinical_data(&mut self, patient_id: &str, data_type: &str) -> Result<Value>;

    async fn create_encounter(&mut self, encounter: &EncounterData) -> Result<Value>;

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builds an EHR backend for a given tag.
pub trait EhrConnectorFactory: Send + Sync {
    fn create(&self, system: EhrSystem) -> Result<Box<dyn EhrConnector>>;
}
