//! Clinical data submission (`sehey`) as FHIR transaction bundles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use medcode_domain::constants::{ICD10AM_SYSTEM, SCHI_SYSTEM, STRUCTURE_DEFINITION_BASE};
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connector::RequestExecutor;

const NATIONAL_ID_SYSTEM: &str = "https://nphies.sa/identifier/national-id";
const CONDITION_CLINICAL_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/condition-clinical";
const CONDITION_CATEGORY_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/condition-category";
const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClinicalPatient {
    pub id: String,
    pub national_id: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(default)]
    pub given_name_ar: String,
    #[serde(default)]
    pub family_name_ar: String,
    pub gender: String,
    pub birth_date: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClinicalEncounter {
    pub id: String,
    pub patient_id: String,
    /// `inpatient` maps to class `IMP`, anything else to `AMB`.
    pub encounter_type: String,
    #[serde(default)]
    pub status: Option<String>,
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClinicalDiagnosis {
    pub icd10_code: String,
    #[serde(default)]
    pub description: String,
    pub patient_id: String,
    pub encounter_id: String,
    #[serde(default)]
    pub onset_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySite {
    pub code: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClinicalProcedure {
    pub schi_code: String,
    #[serde(default)]
    pub description: String,
    pub patient_id: String,
    pub encounter_id: String,
    #[serde(default)]
    pub performed_date: Option<String>,
    #[serde(default)]
    pub body_site: Option<BodySite>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClinicalSubmission {
    #[serde(default)]
    pub patient: Option<ClinicalPatient>,
    #[serde(default)]
    pub encounter: Option<ClinicalEncounter>,
    #[serde(default)]
    pub diagnoses: Vec<ClinicalDiagnosis>,
    #[serde(default)]
    pub procedures: Vec<ClinicalProcedure>,
}

pub fn build_patient_resource(patient: &ClinicalPatient) -> Value {
    json!({
        "resourceType": "Patient",
        "id": patient.id,
        "identifier": [{ "system": NATIONAL_ID_SYSTEM, "value": patient.national_id }],
        "name": [{
            "use": "official",
            "family": patient.family_name,
            "given": [patient.given_name],
            "extension": [{
                "url": format!("{STRUCTURE_DEFINITION_BASE}/extension-name-arabic"),
                "valueString": format!("{} {}", patient.given_name_ar, patient.family_name_ar),
            }],
        }],
        "gender": patient.gender,
        "birthDate": patient.birth_date,
        "address": [{
            "use": "home",
            "city": patient.city,
            "state": patient.region,
            "country": "SA",
        }],
    })
}

pub fn encounter_class(encounter_type: &str) -> &'static str {
    if encounter_type.eq_ignore_ascii_case("inpatient") {
        "IMP"
    } else {
        "AMB"
    }
}

pub fn build_encounter_resource(encounter: &ClinicalEncounter) -> Value {
    json!({
        "resourceType": "Encounter",
        "id": encounter.id,
        "status": encounter.status.as_deref().unwrap_or("finished"),
        "class": {
            "system": ACT_CODE_SYSTEM,
            "code": encounter_class(&encounter.encounter_type),
        },
        "subject": { "reference": format!("Patient/{}", encounter.patient_id) },
        "period": { "start": encounter.start, "end": encounter.end },
    })
}

pub fn build_condition_resource(diagnosis: &ClinicalDiagnosis, id: String) -> Value {
    let mut resource = json!({
        "resourceType": "Condition",
        "id": id,
        "clinicalStatus": {
            "coding": [{ "system": CONDITION_CLINICAL_SYSTEM, "code": "active" }],
        },
        "code": {
            "coding": [{
                "system": ICD10AM_SYSTEM,
                "code": diagnosis.icd10_code,
                "display": diagnosis.description,
            }],
        },
        "subject": { "reference": format!("Patient/{}", diagnosis.patient_id) },
        "encounter": { "reference": format!("Encounter/{}", diagnosis.encounter_id) },
        "category": [{
            "coding": [{
                "system": CONDITION_CATEGORY_SYSTEM,
                "code": diagnosis.category.as_deref().unwrap_or("encounter-diagnosis"),
            }],
        }],
    });
    if let Some(onset) = &diagnosis.onset_date {
        resource["onsetDateTime"] = json!(onset);
    }
    resource
}

pub fn build_procedure_resource(procedure: &ClinicalProcedure, id: String) -> Value {
    let mut resource = json!({
        "resourceType": "Procedure",
        "id": id,
        "status": "completed",
        "code": {
            "coding": [{
                "system": SCHI_SYSTEM,
                "code": procedure.schi_code,
                "display": procedure.description,
            }],
        },
        "subject": { "reference": format!("Patient/{}", procedure.patient_id) },
        "encounter": { "reference": format!("Encounter/{}", procedure.encounter_id) },
    });
    if let Some(performed) = &procedure.performed_date {
        resource["performedDateTime"] = json!(performed);
    }
    if let Some(site) = &procedure.body_site {
        resource["bodySite"] = json!([{
            "coding": [{ "system": SNOMED_SYSTEM, "code": site.code, "display": site.display }],
        }]);
    }
    resource
}

/// Transaction bundle: the patient as `PUT`, everything else as `POST`.
/// Condition and procedure ids derive from `now` and their entry position.
pub fn build_clinical_bundle(submission: &ClinicalSubmission, now: DateTime<Utc>) -> Value {
    let millis = now.timestamp_millis();
    let mut entries = Vec::new();

    if let Some(patient) = &submission.patient {
        entries.push(json!({
            "resource": build_patient_resource(patient),
            "request": { "method": "PUT", "url": format!("Patient/{}", patient.id) },
        }));
    }
    if let Some(encounter) = &submission.encounter {
        entries.push(json!({
            "resource": build_encounter_resource(encounter),
            "request": { "method": "POST", "url": "Encounter" },
        }));
    }
    for (index, diagnosis) in submission.diagnoses.iter().enumerate() {
        let id = format!("condition-{millis}-{}", index + 1);
        entries.push(json!({
            "resource": build_condition_resource(diagnosis, id),
            "request": { "method": "POST", "url": "Condition" },
        }));
    }
    for (index, procedure) in submission.procedures.iter().enumerate() {
        let id = format!("procedure-{millis}-{}", index + 1);
        entries.push(json!({
            "resource": build_procedure_resource(procedure, id),
            "request": { "method": "POST", "url": "Procedure" },
        }));
    }

    json!({
        "resourceType": "Bundle",
        "id": format!("clinical-{millis}"),
        "type": "transaction",
        "entry": entries,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryError {
    pub resource: Option<String>,
    pub status: String,
    pub outcome: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalSubmissionResult {
    pub success: bool,
    pub bundle_id: Option<String>,
    pub entries_processed: usize,
    pub errors: Vec<EntryError>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntryResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    outcome: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEntryResource {
    #[serde(rename = "resourceType")]
    resource_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    resource: Option<RawEntryResource>,
    #[serde(default)]
    response: Option<RawEntryResponse>,
}

#[derive(Debug, Deserialize)]
struct RawBundleResponse {
    #[serde(rename = "resourceType", default)]
    resource_type: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    entry: Vec<RawEntry>,
}

impl From<RawBundleResponse> for ClinicalSubmissionResult {
    fn from(raw: RawBundleResponse) -> Self {
        let mut entries_processed = 0;
        let mut errors = Vec::new();
        for entry in raw.entry {
            let Some(response) = entry.response else {
                continue;
            };
            entries_processed += 1;
            if !response.status.starts_with('2') {
                errors.push(EntryError {
                    resource: entry.resource.and_then(|r| r.resource_type),
                    status: response.status,
                    outcome: response.outcome,
                });
            }
        }
        Self {
            success: raw.resource_type.as_deref() == Some("Bundle"),
            bundle_id: raw.id,
            entries_processed,
            errors,
            warnings: Vec::new(),
        }
    }
}

pub struct ClinicalService {
    executor: Arc<RequestExecutor>,
}

impl ClinicalService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn submit_clinical_data(
        &self,
        submission: &ClinicalSubmission,
        now: DateTime<Utc>,
    ) -> Result<ClinicalSubmissionResult> {
        let bundle = build_clinical_bundle(submission, now);
        let response = self.executor.post_json("/sehey/clinical-data", &bundle).await?;
        let raw: RawBundleResponse = serde_json::from_value(response)?;
        Ok(raw.into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn submission() -> ClinicalSubmission {
        ClinicalSubmission {
            patient: Some(ClinicalPatient {
                id: "p1".into(),
                national_id: "1012345678".into(),
                given_name: "Ahmed".into(),
                family_name: "Al-Rashid".into(),
                given_name_ar: "أحمد".into(),
                family_name_ar: "الراشد".into(),
                gender: "male".into(),
                birth_date: "1975-05-20".into(),
                city: Some("Riyadh".into()),
                region: None,
            }),
            encounter: Some(ClinicalEncounter {
                id: "e1".into(),
                patient_id: "p1".into(),
                encounter_type: "inpatient".into(),
                status: None,
                start: "2024-01-15".into(),
                end: None,
            }),
            diagnoses: vec![ClinicalDiagnosis {
                icd10_code: "I21.9".into(),
                patient_id: "p1".into(),
                encounter_id: "e1".into(),
                ..Default::default()
            }],
            procedures: vec![ClinicalProcedure {
                schi_code: "SCHI-12345".into(),
                patient_id: "p1".into(),
                encounter_id: "e1".into(),
                body_site: Some(BodySite { code: "80891009".into(), display: "Heart".into() }),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn bundle_orders_entries_and_methods() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let bundle = build_clinical_bundle(&submission(), now);
        let entries = bundle["entry"].as_array().unwrap();
        assert_eq!(bundle["type"], "transaction");
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["request"]["method"], "PUT");
        assert_eq!(entries[0]["request"]["url"], "Patient/p1");
        assert_eq!(entries[1]["resource"]["class"]["code"], "IMP");
        assert_eq!(entries[2]["resource"]["code"]["coding"][0]["system"], ICD10AM_SYSTEM);
        assert_eq!(
            entries[2]["resource"]["category"][0]["coding"][0]["code"],
            "encounter-diagnosis"
        );
        assert_eq!(entries[3]["resource"]["bodySite"][0]["coding"][0]["display"], "Heart");
        assert_eq!(
            entries[2]["resource"]["id"],
            format!("condition-{}-1", now.timestamp_millis())
        );
    }

    #[test]
    fn patient_carries_arabic_name_and_country() {
        let patient = build_patient_resource(submission().patient.as_ref().unwrap());
        assert_eq!(patient["name"][0]["extension"][0]["valueString"], "أحمد الراشد");
        assert_eq!(patient["address"][0]["country"], "SA");
    }

    #[test]
    fn procedure_without_site_omits_body_site() {
        let procedure = ClinicalProcedure { schi_code: "SCHI-1234".into(), ..Default::default() };
        let resource = build_procedure_resource(&procedure, "proc".into());
        assert!(resource.get("bodySite").is_none());
        assert!(resource.get("performedDateTime").is_none());
    }

    #[test]
    fn response_counts_entries_and_collects_failures() {
        let raw: RawBundleResponse = serde_json::from_value(json!({
            "resourceType": "Bundle",
            "id": "resp-1",
            "entry": [
                { "response": { "status": "201 Created" } },
                {
                    "resource": { "resourceType": "Condition" },
                    "response": { "status": "400 Bad Request", "outcome": { "issue": [] } }
                },
                { "resource": { "resourceType": "Patient" } }
            ]
        }))
        .unwrap();
        let result = ClinicalSubmissionResult::from(raw);
        assert!(result.success);
        assert_eq!(result.bundle_id.as_deref(), Some("resp-1"));
        assert_eq!(result.entries_processed, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].resource.as_deref(), Some("Condition"));
        assert_eq!(result.errors[0].status, "400 Bad Request");
    }
}
