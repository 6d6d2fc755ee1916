//! Training helpers built on the exchange rules: synthetic practice bundles
//! and scoring of student code submissions.

use chrono::{DateTime, Utc};
use medcode_domain::constants::SUBMISSION_COMPLIANCE_THRESHOLD;
use medcode_domain::{Result, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::clinical::encounter_class;
use super::validation::{
    check_icd10am_codings, check_schi_codings, ResourceValidation, ValidationService,
};

const NATIONAL_ID_SYSTEM: &str = "https://nphies.sa/identifier/national-id";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PracticeEncounter {
    pub encounter_type: String,
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PracticeScenario {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_family: Option<String>,
    #[serde(default)]
    pub patient_name_ar: Option<String>,
    #[serde(default)]
    pub patient_family_ar: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub encounter: Option<PracticeEncounter>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub expected_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPatient {
    pub id: String,
    pub national_id: String,
    pub given_name: String,
    pub family_name: String,
    pub given_name_ar: String,
    pub family_name_ar: String,
    pub gender: String,
    pub birth_date: String,
    pub city: String,
    pub region: String,
}

/// Synthetic national ids start with `2` so they never collide with citizen
/// ids.
pub fn synthetic_patient(scenario: &PracticeScenario, now: DateTime<Utc>) -> SyntheticPatient {
    let millis = now.timestamp_millis();
    let pick = |value: &Option<String>, fallback: &str| {
        value.clone().unwrap_or_else(|| fallback.to_string())
    };
    SyntheticPatient {
        id: format!("synthetic-{millis}"),
        national_id: format!("2{:09}", millis.rem_euclid(1_000_000_000)),
        given_name: pick(&scenario.patient_name, "Patient"),
        family_name: pick(&scenario.patient_family, "Synthetic"),
        given_name_ar: pick(&scenario.patient_name_ar, "مريض"),
        family_name_ar: pick(&scenario.patient_family_ar, "وهمي"),
        gender: pick(&scenario.gender, "unknown"),
        birth_date: pick(&scenario.birth_date, "1980-01-01"),
        city: pick(&scenario.city, "Riyadh"),
        region: pick(&scenario.region, "Riyadh Province"),
    }
}

pub fn build_practice_bundle(
    patient: &SyntheticPatient,
    scenario: &PracticeScenario,
    now: DateTime<Utc>,
) -> Value {
    let millis = now.timestamp_millis();
    let mut entries = vec![json!({
        "resource": {
            "resourceType": "Patient",
            "id": patient.id,
            "identifier": [{ "system": NATIONAL_ID_SYSTEM, "value": patient.national_id }],
            "name": [{
                "use": "official",
                "family": patient.family_name,
                "given": [patient.given_name],
            }],
            "gender": patient.gender,
            "birthDate": patient.birth_date,
        }
    })];
    if let Some(encounter) = &scenario.encounter {
        entries.push(json!({
            "resource": {
                "resourceType": "Encounter",
                "id": format!("encounter-{millis}"),
                "status": "finished",
                "class": {
                    "system": "http://terminology.hl7.org/CodeSystem/v3-ActCode",
                    "code": encounter_class(&encounter.encounter_type),
                },
                "subject": { "reference": format!("Patient/{}", patient.id) },
                "period": { "start": encounter.start, "end": encounter.end },
            }
        }));
    }
    json!({
        "resourceType": "Bundle",
        "id": format!("practice-{millis}"),
        "type": "collection",
        "entry": entries,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeCase {
    pub scenario_id: String,
    pub patient: SyntheticPatient,
    pub practice_bundle: Value,
    pub validation_results: ResourceValidation,
    pub learning_objectives: Vec<String>,
    pub expected_codes: Vec<String>,
}

/// Codes a student entered for one case.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentSubmission {
    #[serde(default)]
    pub diagnoses: Vec<String>,
    #[serde(default)]
    pub procedures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementFeedback {
    /// `diagnosis` or `procedure`.
    pub element: &'static str,
    pub code: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReview {
    pub overall_score: f64,
    pub nphies_compliant: bool,
    pub detailed_feedback: Vec<ElementFeedback>,
}

fn feedback(element: &'static str, code: &str, outcome: ValidationOutcome) -> ElementFeedback {
    ElementFeedback {
        element,
        code: code.to_string(),
        valid: outcome.valid,
        errors: outcome.errors,
    }
}

/// Check each code against its coding system. The score is the share of
/// valid codes, zero for an empty submission.
pub fn validate_student_submission(submission: &StudentSubmission) -> SubmissionReview {
    let diagnoses = submission
        .diagnoses
        .iter()
        .map(|code| feedback("diagnosis", code, check_icd10am_codings(&[code.as_str()])));
    let procedures = submission
        .procedures
        .iter()
        .map(|code| feedback("procedure", code, check_schi_codings(&[code.as_str()])));
    let detailed_feedback: Vec<ElementFeedback> = diagnoses.chain(procedures).collect();

    let valid = detailed_feedback.iter().filter(|feedback| feedback.valid).count();
    let overall_score = if detailed_feedback.is_empty() {
        0.0
    } else {
        valid as f64 / detailed_feedback.len() as f64
    };
    SubmissionReview {
        overall_score,
        nphies_compliant: overall_score >= SUBMISSION_COMPLIANCE_THRESHOLD,
        detailed_feedback,
    }
}

/// Build a synthetic case and have the gateway validate its bundle.
pub async fn create_practice_case(
    validation: &ValidationService,
    scenario: &PracticeScenario,
    now: DateTime<Utc>,
) -> Result<PracticeCase> {
    let patient = synthetic_patient(scenario, now);
    let bundle = build_practice_bundle(&patient, scenario, now);
    let validation_results = validation.validate_resource(&bundle, "Bundle").await?;
    Ok(PracticeCase {
        scenario_id: format!("edu-{}", now.timestamp_millis()),
        patient,
        practice_bundle: bundle,
        validation_results,
        learning_objectives: scenario.learning_objectives.clone(),
        expected_codes: scenario.expected_codes.clone(),
    })
}
