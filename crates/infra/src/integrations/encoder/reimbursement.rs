//! Saudi reimbursement estimates.

use std::sync::Arc;

use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::connector::RequestExecutor;

/// Claim submitted for a reimbursement estimate. Fields beyond payer and
/// facility type are passed through unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReimbursementClaim {
    /// `government`, `private` or `cash`.
    pub payer_type: String,
    pub facility_type: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

pub fn build_reimbursement_request(claim: &ReimbursementClaim) -> Value {
    json!({
        "claim_data": claim,
        "payer_type": claim.payer_type,
        "facility_type": claim.facility_type,
        "saudi_billing_rates": true,
        "ar_drg_rates": true,
        "nphies_compliant": true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReimbursementBreakdown {
    pub base_drg_payment: f64,
    pub outlier_payments: f64,
    pub quality_adjustments: f64,
    pub saudi_specific_adjustments: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReimbursementEstimate {
    pub claim_id: String,
    pub total_reimbursement_sar: f64,
    pub breakdown: ReimbursementBreakdown,
    pub payment_timeline: Value,
    pub potential_denials: Vec<Value>,
    pub optimization_opportunities: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawTotals {
    #[serde(default)]
    total_amount: f64,
}

#[derive(Debug, Deserialize)]
struct RawBreakdown {
    #[serde(default)]
    base_payment: f64,
    #[serde(default)]
    outlier_payments: f64,
    #[serde(default)]
    quality_adjustments: f64,
    #[serde(default)]
    saudi_adjustments: f64,
}

#[derive(Debug, Deserialize)]
struct RawReimbursement {
    claim_id: String,
    totals: RawTotals,
    breakdown: RawBreakdown,
    #[serde(default)]
    payment_schedule: Value,
    #[serde(default)]
    denial_risks: Vec<Value>,
    #[serde(default)]
    optimization: Vec<Value>,
}

impl From<RawReimbursement> for ReimbursementEstimate {
    fn from(raw: RawReimbursement) -> Self {
        Self {
            claim_id: raw.claim_id,
            total_reimbursement_sar: raw.totals.total_amount,
            breakdown: ReimbursementBreakdown {
                base_drg_payment: raw.breakdown.base_payment,
                outlier_payments: raw.breakdown.outlier_payments,
                quality_adjustments: raw.breakdown.quality_adjustments,
                saudi_specific_adjustments: raw.breakdown.saudi_adjustments,
            },
            payment_timeline: raw.payment_schedule,
            potential_denials: raw.denial_risks,
            optimization_opportunities: raw.optimization,
        }
    }
}

pub struct ReimbursementService {
    executor: Arc<RequestExecutor>,
}

impl ReimbursementService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn calculate(&self, claim: &ReimbursementClaim) -> Result<ReimbursementEstimate> {
        let body = build_reimbursement_request(claim);
        let response = self.executor.post_json("/reimbursement/calculate", &body).await?;
        let raw: RawReimbursement = serde_json::from_value(response)?;
        Ok(raw.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_details_pass_through() {
        let mut details = Map::new();
        details.insert("drg_code".into(), json!("F60A"));
        let claim = ReimbursementClaim {
            payer_type: "government".into(),
            facility_type: "tertiary".into(),
            details,
        };
        let body = build_reimbursement_request(&claim);
        assert_eq!(body["claim_data"]["drg_code"], "F60A");
        assert_eq!(body["claim_data"]["payer_type"], "government");
        assert_eq!(body["ar_drg_rates"], true);
    }

    #[test]
    fn estimate_flattens_totals() {
        let raw: RawReimbursement = serde_json::from_value(json!({
            "claim_id": "c1",
            "totals": { "total_amount": 25_000.5 },
            "breakdown": { "base_payment": 20_000.0, "saudi_adjustments": 500.0 }
        }))
        .expect("decode");
        let estimate = ReimbursementEstimate::from(raw);
        assert_eq!(estimate.total_reimbursement_sar, 25_000.5);
        assert_eq!(estimate.breakdown.base_drg_payment, 20_000.0);
        assert_eq!(estimate.breakdown.saudi_specific_adjustments, 500.0);
        assert!(estimate.potential_denials.is_empty());
    }
}
