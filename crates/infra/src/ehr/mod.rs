//! Remote EHR sandboxes for virtual lab sessions.
//!
//! Each backend implements [`medcode_core::EhrConnector`]. The
//! [`EhrRegistry`] builds the right one for an [`medcode_domain::EhrSystem`]
//! tag, falling back to the in-memory simulator from `medcode-core`.

pub mod epic;
pub mod meditech;
pub mod oracle;
pub mod registry;

use medcode_core::lab::ScenarioPatient;
use medcode_domain::{EhrSystem, PatientRecord};
use serde_json::Value;

pub use epic::EpicSandboxEhr;
pub use meditech::MeditechExpanseEhr;
pub use oracle::OracleHealthEhr;
pub use registry::EhrRegistry;

/// Remote backends keep patients on their side, so loading a scenario
/// patient only tags it with the backend.
pub(crate) fn patient_record(patient: &ScenarioPatient, system: EhrSystem) -> PatientRecord {
    PatientRecord {
        id: patient.id.clone(),
        name: patient.name.clone(),
        dob: patient.dob.clone(),
        mrn: patient.mrn.clone(),
        system,
    }
}

/// Search endpoints answer with a list, a `{ "patients": [...] }` page or a
/// single patient. Empty answers mean no match.
pub(crate) fn first_patient(response: Value) -> Option<Value> {
    match response {
        Value::Null => None,
        Value::Array(items) => items.into_iter().next(),
        Value::Object(mut map) => match map.remove("patients") {
            Some(Value::Array(items)) => items.into_iter().next(),
            Some(other) => Some(other),
            None if map.is_empty() => None,
            None => Some(Value::Object(map)),
        },
        other => Some(other),
    }
}
