//! Claim submission and status.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use medcode_domain::constants::{CURRENCY, ICD10AM_SYSTEM, SCHI_SYSTEM};
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connector::{endpoint_path, RequestExecutor, RequestOptions};

const CLAIM_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/claim-type";
const PRIORITY_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/processpriority";
const DIAGNOSIS_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/ex-diagnosistype";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimDiagnosis {
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `principal`.
    #[serde(rename = "type", default)]
    pub diagnosis_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimProcedure {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimItem {
    pub coding_system: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    pub unit_price: f64,
}

impl ClaimItem {
    pub fn quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    /// Quantity times unit price.
    pub fn net(&self) -> f64 {
        f64::from(self.quantity()) * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub patient_id: String,
    pub provider_id: String,
    pub coverage_id: String,
    /// Defaults to `institutional`.
    #[serde(rename = "type", default)]
    pub claim_type: Option<String>,
    /// Defaults to `normal`.
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub diagnoses: Vec<ClaimDiagnosis>,
    #[serde(default)]
    pub procedures: Vec<ClaimProcedure>,
    #[serde(default)]
    pub items: Vec<ClaimItem>,
}

pub fn build_claim_resource(claim: &ClaimSubmission, now: DateTime<Utc>) -> Value {
    let diagnoses: Vec<Value> = claim
        .diagnoses
        .iter()
        .enumerate()
        .map(|(index, diagnosis)| {
            json!({
                "sequence": index + 1,
                "diagnosisCodeableConcept": {
                    "coding": [{
                        "system": ICD10AM_SYSTEM,
                        "code": diagnosis.code,
                        "display": diagnosis.description,
                    }],
                },
                "type": [{
                    "coding": [{
                        "system": DIAGNOSIS_TYPE_SYSTEM,
                        "code": diagnosis.diagnosis_type.as_deref().unwrap_or("principal"),
                    }],
                }],
            })
        })
        .collect();

    let procedures: Vec<Value> = claim
        .procedures
        .iter()
        .enumerate()
        .map(|(index, procedure)| {
            json!({
                "sequence": index + 1,
                "date": procedure.date,
                "procedureCodeableConcept": {
                    "coding": [{
                        "system": SCHI_SYSTEM,
                        "code": procedure.code,
                        "display": procedure.description,
                    }],
                },
            })
        })
        .collect();

    let items: Vec<Value> = claim
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            json!({
                "sequence": index + 1,
                "productOrService": {
                    "coding": [{
                        "system": item.coding_system,
                        "code": item.code,
                        "display": item.description,
                    }],
                },
                "quantity": { "value": item.quantity() },
                "unitPrice": { "value": item.unit_price, "currency": CURRENCY },
                "net": { "value": item.net(), "currency": CURRENCY },
            })
        })
        .collect();

    json!({
        "resourceType": "Claim",
        "id": format!("claim-{}", now.timestamp_millis()),
        "status": "active",
        "type": {
            "coding": [{
                "system": CLAIM_TYPE_SYSTEM,
                "code": claim.claim_type.as_deref().unwrap_or("institutional"),
            }],
        },
        "use": "claim",
        "patient": { "reference": format!("Patient/{}", claim.patient_id) },
        "created": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "provider": { "reference": format!("Organization/{}", claim.provider_id) },
        "priority": {
            "coding": [{
                "system": PRIORITY_SYSTEM,
                "code": claim.priority.as_deref().unwrap_or("normal"),
            }],
        },
        "insurance": [{
            "sequence": 1,
            "focal": true,
            "coverage": { "reference": format!("Coverage/{}", claim.coverage_id) },
        }],
        "diagnosis": diagnoses,
        "procedure": procedures,
        "item": items,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAdjudication {
    pub sequence: u32,
    #[serde(default)]
    pub adjudication: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResult {
    #[serde(rename(deserialize = "id"))]
    pub claim_id: Option<String>,
    pub status: Option<String>,
    pub outcome: Option<String>,
    #[serde(rename(deserialize = "item"), default)]
    pub adjudication: Vec<ItemAdjudication>,
    pub total: Option<Value>,
    #[serde(rename(deserialize = "error"), default)]
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimStatus {
    pub claim_id: String,
    pub status: Option<String>,
    pub last_updated: Option<String>,
    pub outcome: Option<String>,
    pub payment_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(rename = "lastUpdated")]
    last_updated: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayment {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClaimStatus {
    status: Option<String>,
    outcome: Option<String>,
    #[serde(default)]
    meta: RawMeta,
    #[serde(default)]
    payment: RawPayment,
}

pub struct BillingService {
    executor: Arc<RequestExecutor>,
}

impl BillingService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn submit_claim(
        &self,
        claim: &ClaimSubmission,
        now: DateTime<Utc>,
    ) -> Result<ClaimResult> {
        let body = build_claim_resource(claim, now);
        let response = self.executor.post_json("/billing/claim", &body).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn claim_status(&self, claim_id: &str) -> Result<ClaimStatus> {
        let endpoint = endpoint_path("/billing/claim", &[claim_id, "status"])?;
        let response = self.executor.get_json(&endpoint, RequestOptions::new()).await?;
        let raw: RawClaimStatus = serde_json::from_value(response)?;
        Ok(ClaimStatus {
            claim_id: claim_id.to_string(),
            status: raw.status,
            last_updated: raw.meta.last_updated,
            outcome: raw.outcome,
            payment_status: raw.payment.status,
        })
    }
}
