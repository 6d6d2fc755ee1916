//! FHIR resource compliance: Minimum Data Set rules, the gateway's structure
//! check and coding-system checks.

use std::sync::Arc;

use medcode_core::coding::formats::{is_valid_icd10, is_valid_schi};
use medcode_domain::constants::{ICD10AM_SYSTEM, SCHI_SYSTEM, STRUCTURE_DEFINITION_BASE};
use medcode_domain::{Result, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::connector::RequestExecutor;

/// Required and conditional fields of one resource type.
#[derive(Debug, Clone, Copy)]
pub struct MdsRequirements {
    pub required: &'static [&'static str],
    pub conditional: &'static [&'static str],
}

/// Minimum Data Set v3.1.
pub fn mds_requirements(resource_type: &str) -> Option<MdsRequirements> {
    let requirements = match resource_type {
        "Patient" => MdsRequirements {
            required: &["identifier", "name", "gender", "birthDate"],
            conditional: &["address", "telecom"],
        },
        "Encounter" => MdsRequirements {
            required: &["status", "class", "subject", "period"],
            conditional: &["diagnosis", "hospitalization"],
        },
        "Condition" => MdsRequirements {
            required: &["clinicalStatus", "code", "subject"],
            conditional: &["encounter", "onsetDateTime"],
        },
        "Procedure" => MdsRequirements {
            required: &["status", "code", "subject"],
            conditional: &["encounter", "performedDateTime"],
        },
        "Claim" => MdsRequirements {
            required: &[
                "status",
                "type",
                "use",
                "patient",
                "created",
                "provider",
                "priority",
                "insurance",
            ],
            conditional: &["diagnosis", "procedure", "item"],
        },
        _ => return None,
    };
    Some(requirements)
}

/// True when the dotted `path` resolves to a non-null value.
pub fn has_field(resource: &Value, path: &str) -> bool {
    let mut current = resource;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    !current.is_null()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdsCheck {
    pub compliant: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn check_mds(resource: &Value, resource_type: &str) -> MdsCheck {
    let mut check = MdsCheck { compliant: true, errors: Vec::new(), warnings: Vec::new() };
    let Some(requirements) = mds_requirements(resource_type) else {
        check.warnings.push(format!("No MDS requirements defined for {resource_type}"));
        return check;
    };
    for field in requirements.required {
        if !has_field(resource, field) {
            check.compliant = false;
            check.errors.push(format!("Required MDS field missing: {field}"));
        }
    }
    for field in requirements.conditional {
        if !has_field(resource, field) {
            check.warnings.push(format!("Conditional MDS field missing: {field}"));
        }
    }
    check
}

fn codings_for<'a>(resource: &'a Value, system: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    resource
        .pointer("/code/coding")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |coding| coding.get("system").and_then(Value::as_str) == Some(system))
        .map(|coding| coding.get("code").and_then(Value::as_str).unwrap_or_default())
}

/// Every ICD-10-AM coding must be well formed and at least one must exist.
pub fn check_icd10am_codings(codes: &[&str]) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();
    if codes.is_empty() {
        outcome.error("ICD-10-AM coding required for diagnosis");
    } else if let Some(bad) = codes.iter().find(|code| !is_valid_icd10(code)) {
        outcome.error(format!("Invalid ICD-10-AM code format: {bad}"));
    }
    outcome
}

pub fn check_schi_codings(codes: &[&str]) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();
    if codes.is_empty() {
        outcome.error("SCHI coding required for procedures");
    } else if let Some(bad) = codes.iter().find(|code| !is_valid_schi(code)) {
        outcome.error(format!("Invalid SCHI code format: {bad}"));
    }
    outcome
}

/// Conditions need ICD-10-AM and procedures SCHI codings. Resources without
/// a `code.coding` array and other types pass.
pub fn check_code_systems(resource: &Value, resource_type: &str) -> ValidationOutcome {
    if resource.pointer("/code/coding").and_then(Value::as_array).is_none() {
        return ValidationOutcome::new();
    }
    match resource_type {
        "Condition" => {
            let codes: Vec<&str> = codings_for(resource, ICD10AM_SYSTEM).collect();
            check_icd10am_codings(&codes)
        }
        "Procedure" => {
            let codes: Vec<&str> = codings_for(resource, SCHI_SYSTEM).collect();
            check_schi_codings(&codes)
        }
        _ => ValidationOutcome::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValidation {
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    pub mds_compliant: bool,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    severity: String,
    #[serde(default)]
    diagnostics: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOperationOutcome {
    #[serde(default)]
    issue: Option<Vec<RawIssue>>,
}

/// Only an explicit empty issue list counts as a clean check.
impl From<RawOperationOutcome> for ValidationOutcome {
    fn from(raw: RawOperationOutcome) -> Self {
        let mut outcome = ValidationOutcome::new();
        let Some(issues) = raw.issue else {
            outcome.error("FHIR validation returned no issue list");
            return outcome;
        };
        outcome.valid = issues.is_empty();
        outcome.errors = issues
            .into_iter()
            .filter(|issue| issue.severity == "error")
            .filter_map(|issue| issue.diagnostics)
            .collect();
        outcome
    }
}

pub struct ValidationService {
    executor: Arc<RequestExecutor>,
}

impl ValidationService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Run the MDS rules, the remote structure check and the coding checks.
    ///
    /// MDS findings only affect `mds_compliant`; `valid` reflects the
    /// structure and coding checks.
    pub async fn validate_resource(
        &self,
        resource: &Value,
        resource_type: &str,
    ) -> Result<ResourceValidation> {
        let mds = check_mds(resource, resource_type);
        let mut outcome = ValidationOutcome::new();
        outcome.errors.extend(mds.errors);
        outcome.warnings.extend(mds.warnings);

        outcome.merge(self.validate_structure(resource, resource_type).await?);
        outcome.merge(check_code_systems(resource, resource_type));

        debug!(
            resource_type,
            valid = outcome.valid,
            mds_compliant = mds.compliant,
            "exchange resource validated"
        );
        Ok(ResourceValidation { outcome, mds_compliant: mds.compliant })
    }

    /// Gateway profile check. A 4xx answer becomes an invalid outcome.
    pub async fn validate_structure(
        &self,
        resource: &Value,
        resource_type: &str,
    ) -> Result<ValidationOutcome> {
        let body = json!({
            "resource": resource,
            "resourceType": resource_type,
            "profile": format!("{STRUCTURE_DEFINITION_BASE}/{resource_type}"),
        });
        match self.executor.post_json("/validation/fhir-structure", &body).await {
            Ok(response) => {
                let raw: RawOperationOutcome = serde_json::from_value(response)?;
                Ok(raw.into())
            }
            Err(err) if err.is_client_rejection() => {
                let mut outcome = ValidationOutcome::new();
                outcome.error(format!("FHIR validation failed: {err}"));
                Ok(outcome)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_field_follows_dotted_paths_and_rejects_null() {
        let resource = json!({
            "code": { "coding": [] },
            "subject": null,
            "period": { "start": "x" }
        });
        assert!(has_field(&resource, "code"));
        assert!(has_field(&resource, "period.start"));
        assert!(!has_field(&resource, "period.end"));
        assert!(!has_field(&resource, "subject"));
        assert!(!has_field(&resource, "status"));
    }

    #[test]
    fn mds_missing_required_field_breaks_compliance() {
        let patient = json!({ "identifier": [], "name": [], "gender": "female" });
        let check = check_mds(&patient, "Patient");
        assert!(!check.compliant);
        assert_eq!(check.errors, vec!["Required MDS field missing: birthDate"]);
        assert_eq!(
            check.warnings,
            vec![
                "Conditional MDS field missing: address",
                "Conditional MDS field missing: telecom"
            ]
        );
    }

    #[test]
    fn mds_unknown_type_is_a_warning() {
        let check = check_mds(&json!({}), "Observation");
        assert!(check.compliant);
        assert!(check.errors.is_empty());
        assert_eq!(check.warnings, vec!["No MDS requirements defined for Observation"]);
    }

    #[test]
    fn condition_requires_icd10am_coding() {
        let condition = json!({ "code": { "coding": [{ "system": "other", "code": "A00" }] } });
        let outcome = check_code_systems(&condition, "Condition");
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec!["ICD-10-AM coding required for diagnosis"]);

        let condition =
            json!({ "code": { "coding": [{ "system": ICD10AM_SYSTEM, "code": "AA00" }] } });
        let outcome = check_code_systems(&condition, "Condition");
        assert_eq!(outcome.errors, vec!["Invalid ICD-10-AM code format: AA00"]);

        let condition =
            json!({ "code": { "coding": [{ "system": ICD10AM_SYSTEM, "code": "A00.1" }] } });
        assert!(check_code_systems(&condition, "Condition").valid);
    }

    #[test]
    fn procedure_requires_schi_coding() {
        let procedure =
            json!({ "code": { "coding": [{ "system": SCHI_SYSTEM, "code": "SCHI-12" }] } });
        let outcome = check_code_systems(&procedure, "Procedure");
        assert_eq!(outcome.errors, vec!["Invalid SCHI code format: SCHI-12"]);

        let no_coding = json!({ "status": "completed" });
        assert!(check_code_systems(&no_coding, "Procedure").valid);
    }

    #[test]
    fn structure_outcome_collects_error_diagnostics() {
        let raw: RawOperationOutcome = serde_json::from_value(json!({
            "issue": [
                { "severity": "error", "diagnostics": "Patient.gender invalid" },
                { "severity": "warning", "diagnostics": "Narrative missing" }
            ]
        }))
        .unwrap();
        let outcome = ValidationOutcome::from(raw);
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec!["Patient.gender invalid"]);

        let clean: RawOperationOutcome = serde_json::from_value(json!({ "issue": [] })).unwrap();
        assert!(ValidationOutcome::from(clean).valid);
    }

    #[test]
    fn outcome_without_issue_list_is_invalid() {
        let raw: RawOperationOutcome =
            serde_json::from_value(json!({ "resourceType": "OperationOutcome" })).unwrap();
        let outcome = ValidationOutcome::from(raw);
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec!["FHIR validation returned no issue list"]);
    }
}
