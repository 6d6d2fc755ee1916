//! In-memory EHR used when no sandbox is configured. Makes no network calls.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use medcode_domain::{EhrSystem, MedCodeError, PatientRecord, Result};
use serde_json::{json, Value};

use super::ports::{EhrConnector, EhrConnectorFactory, PatientCriteria};
use super::scenario::{EncounterData, ScenarioPatient};
use crate::time::Clock;

/// Fixture-backed EHR simulator.
pub struct InMemoryEhr {
    clock: Arc<dyn Clock>,
    patients: Vec<Value>,
    clinical_data: HashMap<String, Value>,
    authenticated: bool,
}

impl InMemoryEhr {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (patients, clinical_data) = fixtures();
        Self { clock, patients, clinical_data, authenticated: false }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

fn fixtures() -> (Vec<Value>, HashMap<String, Value>) {
    let patients = vec![
        json!({
            "id": "PT001",
            "name": "John Doe",
            "dob": "1975-03-15",
            "mrn": "MRN123456",
            "encounters": [{
                "id": "ENC001",
                "type": "inpatient",
                "admission_date": "2024-01-15",
                "discharge_date": "2024-01-18",
                "diagnoses": ["I21.9", "E11.9"],
                "procedures": ["02703ZZ"]
            }]
        }),
        json!({
            "id": "PT002",
            "name": "Jane Smith",
            "dob": "1968-07-22",
            "mrn": "MRN789012",
            "encounters": [{
                "id": "ENC002",
                "type": "outpatient",
                "visit_date": "2024-01-20",
                "diagnoses": ["Z00.00"],
                "procedures": ["99213"]
            }]
        }),
    ];

    let mut clinical_data = HashMap::new();
    clinical_data.insert(
        "PT001".to_string(),
        json!({
            "observations": [
                { "type": "vital_signs", "value": "BP: 140/90, HR: 85, Temp: 98.6°F" },
                { "type": "lab_results", "value": "Troponin I: 0.8 ng/mL (elevated)" }
            ],
            "conditions": [
                { "code": "I21.9", "description": "Acute myocardial infarction, unspecified" },
                { "code": "E11.9", "description": "Type 2 diabetes mellitus without complications" }
            ]
        }),
    );
    clinical_data.insert(
        "PT002".to_string(),
        json!({
            "observations": [
                { "type": "vital_signs", "value": "BP: 128/82, HR: 76, Temp: 98.4°F" }
            ],
            "conditions": [
                {
                    "code": "Z00.00",
                    "description": "General adult medical examination without abnormal findings"
                }
            ]
        }),
    );

    (patients, clinical_data)
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl EhrConnector for InMemoryEhr {
    fn system(&self) -> EhrSystem {
        EhrSystem::InternalSimulator
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.authenticated = true;
        Ok(())
    }

    async fn search_patient(&mut self, criteria: &PatientCriteria) -> Result<Option<Value>> {
        let wanted_name = criteria.name.as_deref().map(str::to_lowercase);
        let found = self.patients.iter().find(|patient| {
            if let Some(name) = &wanted_name {
                if !field(patient, "name").to_lowercase().contains(name.as_str()) {
                    return false;
                }
            }
            if let Some(mrn) = &criteria.mrn {
                if field(patient, "mrn") != mrn {
                    return false;
                }
            }
            true
        });
        Ok(found.cloned())
    }

    async fn load_patient(&mut self, patient: &ScenarioPatient) -> Result<PatientRecord> {
        Ok(PatientRecord {
            id: patient.id.clone(),
            name: patient.name.clone(),
            dob: patient.dob.clone(),
            mrn: patient.mrn.clone(),
            system: EhrSystem::InternalSimulator,
        })
    }

    async fn get_clinical_data(&mut self, patient_id: &str, data_type: &str) -> Result<Value> {
        Ok(self
            .clinical_data
            .get(patient_id)
            .and_then(|data| data.get(data_type))
            .cloned()
            .unwrap_or_else(|| json!([])))
    }

    async fn create_encounter(&mut self, encounter: &EncounterData) -> Result<Value> {
        let now = self.clock.now();
        let mut created = serde_json::to_value(encounter)?;
        let object = created.as_object_mut().ok_or_else(|| {
            MedCodeError::Internal("encounter did not serialize to an object".into())
        })?;
        object.insert("id".into(), json!(format!("ENC_{}", now.timestamp_millis())));
        object.insert("created_at".into(), json!(now.to_rfc3339()));
        object.insert("system".into(), json!(EhrSystem::InternalSimulator.as_str()));
        Ok(created)
    }
}

/// Factory that can only build the simulator.
pub struct SimulatorFactory {
    clock: Arc<dyn Clock>,
}

impl SimulatorFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl EhrConnectorFactory for SimulatorFactory {
    fn create(&self, system: EhrSystem) -> Result<Box<dyn EhrConnector>> {
        match system {
            EhrSystem::InternalSimulator => Ok(Box::new(InMemoryEhr::new(Arc::clone(&self.clock)))),
            other => Err(MedCodeError::Config(format!("EHR backend {other} is not configured"))),
        }
    }
}
