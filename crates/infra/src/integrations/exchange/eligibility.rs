//! Insurance eligibility and pre-authorization (`taameen`).

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use medcode_domain::constants::PATIENT_IDENTIFIER_SYSTEM;
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connector::RequestExecutor;

const BENEFIT_CATEGORY_SYSTEM: &str = "https://nphies.sa/terminology/benefit-category";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EligibilityPatient {
    pub id: String,
    /// Preferred over `national_id` when present.
    #[serde(default)]
    pub nphies_id: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    pub insurance_company_id: String,
    pub policy_number: String,
}

pub fn build_eligibility_request(patient: &EligibilityPatient, now: DateTime<Utc>) -> Value {
    let identifier = patient.nphies_id.as_ref().or(patient.national_id.as_ref());
    json!({
        "resourceType": "CoverageEligibilityRequest",
        "id": format!("eligibility-{}", now.timestamp_millis()),
        "status": "active",
        "purpose": ["validation"],
        "patient": {
            "reference": format!("Patient/{}", patient.id),
            "identifier": {
                "system": PATIENT_IDENTIFIER_SYSTEM,
                "value": identifier,
            },
        },
        "insurer": { "reference": format!("Organization/{}", patient.insurance_company_id) },
        "insurance": [{
            "focal": true,
            "coverage": { "reference": format!("Coverage/{}", patient.policy_number) },
        }],
        "created": now.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub coverage_details: Vec<Value>,
    pub benefits: Vec<Value>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInsurance {
    #[serde(default)]
    item: Vec<Value>,
    #[serde(rename = "benefitBalance", default)]
    benefit_balance: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEligibilityResponse {
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default)]
    insurance: Vec<RawInsurance>,
    #[serde(default)]
    error: Vec<Value>,
}

impl From<RawEligibilityResponse> for EligibilityResult {
    fn from(raw: RawEligibilityResponse) -> Self {
        let first = raw.insurance.into_iter().next().unwrap_or_default();
        Self {
            eligible: raw.outcome.as_deref() == Some("complete"),
            coverage_details: first.item,
            benefits: first.benefit_balance,
            errors: raw.error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestedService {
    pub category: String,
    /// Coding system URI of `code`.
    pub coding_system: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreauthorizationRequest {
    pub patient_id: String,
    pub service_date: String,
    pub services: Vec<RequestedService>,
}

pub fn build_preauthorization_request(
    request: &PreauthorizationRequest,
    now: DateTime<Utc>,
) -> Value {
    let items: Vec<Value> = request
        .services
        .iter()
        .map(|service| {
            json!({
                "category": {
                    "coding": [{ "system": BENEFIT_CATEGORY_SYSTEM, "code": service.category }],
                },
                "productOrService": {
                    "coding": [{
                        "system": service.coding_system,
                        "code": service.code,
                        "display": service.description,
                    }],
                },
                "quantity": { "value": service.quantity.unwrap_or(1) },
            })
        })
        .collect();

    json!({
        "resourceType": "CoverageEligibilityRequest",
        "id": format!("preauth-{}", now.timestamp_millis()),
        "status": "active",
        "purpose": ["auth-requirements"],
        "patient": { "reference": format!("Patient/{}", request.patient_id) },
        "servicedDate": request.service_date,
        "item": items,
    })
}

pub struct EligibilityService {
    executor: Arc<RequestExecutor>,
}

impl EligibilityService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn check_eligibility(
        &self,
        patient: &EligibilityPatient,
        now: DateTime<Utc>,
    ) -> Result<EligibilityResult> {
        let body = build_eligibility_request(patient, now);
        let response = self.executor.post_json("/taameen/eligibility", &body).await?;
        let raw: RawEligibilityResponse = serde_json::from_value(response)?;
        Ok(raw.into())
    }

    /// Returns the gateway's answer unchanged.
    pub async fn submit_preauthorization(
        &self,
        request: &PreauthorizationRequest,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        let body = build_preauthorization_request(request, now);
        self.executor.post_json("/taameen/preauthorization", &body).await
    }
}
