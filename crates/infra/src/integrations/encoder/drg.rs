//! AR-DRG grouping, DRG explanations and coding-alternative comparison.

use std::sync::Arc;

use medcode_domain::constants::{COST_WEIGHTS, COUNTRY_CODE, DRG_VERSION};
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::connector::{endpoint_path, RequestExecutor, RequestOptions};

/// Weight difference beyond which one coding is clearly preferable.
const WEIGHT_THRESHOLD: f64 = 0.1;

/// Grouping input for one inpatient episode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrgInput {
    pub age: u32,
    pub gender: String,
    /// Admission weight in grams; relevant for neonates.
    #[serde(default)]
    pub admission_weight: Option<u32>,
    #[serde(default)]
    pub birth_weight: Option<u32>,
    pub admission_date: String,
    #[serde(default)]
    pub discharge_date: Option<String>,
    #[serde(default)]
    pub admission_source: Option<String>,
    #[serde(default)]
    pub discharge_destination: Option<String>,
    #[serde(default)]
    pub same_day_flag: bool,
    pub principal_diagnosis: String,
    #[serde(default)]
    pub secondary_diagnoses: Vec<String>,
    #[serde(default)]
    pub procedures: Vec<String>,
    #[serde(default)]
    pub external_causes: Vec<String>,
}

/// Build the `/drg/calculate` body.
pub fn build_drg_request(input: &DrgInput) -> Value {
    json!({
        "patient_demographics": {
            "age": input.age,
            "gender": input.gender,
            "admission_weight": input.admission_weight,
            "birth_weight": input.birth_weight,
        },
        "admission_data": {
            "admission_date": input.admission_date,
            "discharge_date": input.discharge_date,
            "admission_source": input.admission_source,
            "discharge_destination": input.discharge_destination,
            "same_day_flag": input.same_day_flag,
        },
        "clinical_data": {
            "principal_diagnosis": input.principal_diagnosis,
            "secondary_diagnoses": input.secondary_diagnoses,
            "procedures": input.procedures,
            "external_causes": input.external_causes,
        },
        "configuration": {
            "drg_version": DRG_VERSION,
            "country_code": COUNTRY_CODE,
            "cost_weights": COST_WEIGHTS,
            "severity_adjustment": true,
            "complexity_adjustment": true,
        }
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrgAssignment {
    pub drg_code: String,
    pub drg_description: String,
    pub drg_description_ar: Option<String>,
    /// Medical, surgical or other.
    pub drg_type: Option<String>,
    pub mdc: Option<String>,
    pub mdc_description: Option<String>,
    /// 1-4 scale.
    pub severity_level: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialData {
    pub relative_weight: f64,
    pub base_rate_sar: f64,
    pub expected_cost_sar: f64,
    pub outlier_threshold: Option<f64>,
    pub trim_point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthOfStay {
    pub actual: Option<f64>,
    pub expected: Option<f64>,
    pub outlier_status: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIndicators {
    pub length_of_stay: LengthOfStay,
    pub readmission_risk: Option<Value>,
    pub mortality_risk: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComplicationsComorbidities {
    #[serde(default)]
    pub cc_count: u32,
    #[serde(default)]
    pub mcc_count: u32,
    #[serde(default)]
    pub cc_list: Vec<Value>,
    #[serde(default)]
    pub mcc_list: Vec<Value>,
}

/// Normalized `/drg/calculate` answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrgResult {
    pub drg_assignment: DrgAssignment,
    pub financial_data: FinancialData,
    pub quality_indicators: QualityIndicators,
    pub complications_comorbidities: ComplicationsComorbidities,
    pub validation_messages: Vec<Value>,
    /// Decision path taken by the grouper.
    pub grouper_path: Option<Value>,
    pub saudi_specific_adjustments: Value,
}

#[derive(Debug, Deserialize)]
struct RawDrg {
    code: String,
    #[serde(default)]
    description: String,
    description_ar: Option<String>,
    #[serde(rename = "type")]
    drg_type: Option<String>,
    mdc: Option<String>,
    mdc_description: Option<String>,
    severity_level: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RawFinancial {
    #[serde(default)]
    relative_weight: f64,
    #[serde(default)]
    base_rate_sar: f64,
    #[serde(default)]
    expected_cost_sar: f64,
    outlier_threshold: Option<f64>,
    trim_point: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawQuality {
    los_actual: Option<f64>,
    los_expected: Option<f64>,
    los_outlier: Option<Value>,
    readmission_risk: Option<Value>,
    mortality_risk: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawDrgResponse {
    drg: RawDrg,
    financial: RawFinancial,
    #[serde(default)]
    quality: RawQuality,
    #[serde(default)]
    cc_mcc: ComplicationsComorbidities,
    #[serde(default)]
    messages: Vec<Value>,
    grouper_path: Option<Value>,
    #[serde(default)]
    saudi_adjustments: Option<Value>,
}

impl From<RawDrgResponse> for DrgResult {
    fn from(raw: RawDrgResponse) -> Self {
        Self {
            drg_assignment: DrgAssignment {
                drg_code: raw.drg.code,
                drg_description: raw.drg.description,
                drg_description_ar: raw.drg.description_ar,
                drg_type: raw.drg.drg_type,
                mdc: raw.drg.mdc,
                mdc_description: raw.drg.mdc_description,
                severity_level: raw.drg.severity_level,
            },
            financial_data: FinancialData {
                relative_weight: raw.financial.relative_weight,
                base_rate_sar: raw.financial.base_rate_sar,
                expected_cost_sar: raw.financial.expected_cost_sar,
                outlier_threshold: raw.financial.outlier_threshold,
                trim_point: raw.financial.trim_point,
            },
            quality_indicators: QualityIndicators {
                length_of_stay: LengthOfStay {
                    actual: raw.quality.los_actual,
                    expected: raw.quality.los_expected,
                    outlier_status: raw.quality.los_outlier,
                },
                readmission_risk: raw.quality.readmission_risk,
                mortality_risk: raw.quality.mortality_risk,
            },
            complications_comorbidities: raw.cc_mcc,
            validation_messages: raw.messages,
            grouper_path: raw.grouper_path,
            saudi_specific_adjustments: raw.saudi_adjustments.unwrap_or_else(|| json!({})),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrgExample {
    pub scenario: String,
    pub scenario_ar: Option<String>,
    #[serde(default)]
    pub codes_used: Vec<String>,
    #[serde(default)]
    pub rationale: String,
    pub rationale_ar: Option<String>,
}

/// Bilingual description of one DRG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrgExplanation {
    #[serde(default)]
    pub drg_code: String,
    #[serde(default)]
    pub title: String,
    pub title_ar: Option<String>,
    #[serde(default)]
    pub description: String,
    pub description_ar: Option<String>,
    #[serde(default)]
    pub criteria: Vec<Value>,
    #[serde(default)]
    pub exclusions: Vec<Value>,
    #[serde(default)]
    pub typical_procedures: Vec<Value>,
    pub average_los: Option<f64>,
    pub cost_weight: Option<f64>,
    #[serde(default)]
    pub examples: Vec<DrgExample>,
}

/// One alternative coding of the same episode. Fields left `None` keep the
/// base value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrgAlternative {
    pub scenario_name: String,
    /// Free-form description of what changed, echoed in the comparison.
    #[serde(default)]
    pub changes: Value,
    #[serde(default)]
    pub principal_diagnosis: Option<String>,
    #[serde(default)]
    pub secondary_diagnoses: Option<Vec<String>>,
    #[serde(default)]
    pub procedures: Option<Vec<String>>,
}

impl DrgAlternative {
    pub fn apply(&self, base: &DrgInput) -> DrgInput {
        let mut input = base.clone();
        if let Some(principal) = &self.principal_diagnosis {
            input.principal_diagnosis = principal.clone();
        }
        if let Some(secondary) = &self.secondary_diagnoses {
            input.secondary_diagnoses = secondary.clone();
        }
        if let Some(procedures) = &self.procedures {
            input.procedures = procedures.clone();
        }
        input
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation: String,
    pub reason: String,
    pub financial_impact: String,
    pub confidence: Confidence,
}

/// Recommendation for an alternative, from its weight and cost differences
/// against the base coding.
pub fn recommend(weight_diff: f64, cost_diff: f64) -> Recommendation {
    if weight_diff > WEIGHT_THRESHOLD {
        Recommendation {
            recommendation: "Consider alternative coding".into(),
            reason: format!(
                "Higher DRG weight ({weight_diff:.3}) results in increased reimbursement"
            ),
            financial_impact: format!("+{cost_diff:.2} SAR"),
            confidence: Confidence::High,
        }
    } else if weight_diff < -WEIGHT_THRESHOLD {
        Recommendation {
            recommendation: "Current coding preferred".into(),
            reason: format!(
                "Alternative results in lower DRG weight ({:.3})",
                weight_diff.abs()
            ),
            financial_impact: format!("{cost_diff:.2} SAR"),
            confidence: Confidence::High,
        }
    } else {
        Recommendation {
            recommendation: "Minimal difference".into(),
            reason: "Both coding options result in similar DRG assignment".into(),
            financial_impact: format!("{:.2} SAR difference", cost_diff.abs()),
            confidence: Confidence::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrgDelta {
    pub base_drg: String,
    pub alternative_drg: String,
    pub weight_difference: f64,
    pub cost_impact_sar: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrgComparison {
    pub scenario: String,
    pub drg_comparison: DrgDelta,
    pub coding_changes: Value,
    pub recommendation: Recommendation,
}

impl DrgComparison {
    pub fn between(base: &DrgResult, alternative: &DrgResult, option: &DrgAlternative) -> Self {
        let weight_difference = alternative.financial_data.relative_weight
            - base.financial_data.relative_weight;
        let cost_impact_sar =
            alternative.financial_data.expected_cost_sar - base.financial_data.expected_cost_sar;
        Self {
            scenario: option.scenario_name.clone(),
            drg_comparison: DrgDelta {
                base_drg: base.drg_assignment.drg_code.clone(),
                alternative_drg: alternative.drg_assignment.drg_code.clone(),
                weight_difference,
                cost_impact_sar,
            },
            coding_changes: option.changes.clone(),
            recommendation: recommend(weight_difference, cost_impact_sar),
        }
    }
}

/// Comparison with the largest weight difference; the first one wins ties.
pub fn best_option(comparisons: &[DrgComparison]) -> Option<&DrgComparison> {
    comparisons.iter().reduce(|best, current| {
        if current.drg_comparison.weight_difference > best.drg_comparison.weight_difference {
            current
        } else {
            best
        }
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrgComparisonReport {
    pub base_scenario: DrgResult,
    pub comparisons: Vec<DrgComparison>,
    pub best_option: Option<DrgComparison>,
}

pub struct DrgService {
    executor: Arc<RequestExecutor>,
}

impl DrgService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn calculate_ar_drg(&self, input: &DrgInput) -> Result<DrgResult> {
        let body = build_drg_request(input);
        let response = self.executor.post_json("/drg/calculate", &body).await?;
        let raw: RawDrgResponse = serde_json::from_value(response)?;
        let result = DrgResult::from(raw);
        debug!(drg = %result.drg_assignment.drg_code, "AR-DRG assigned");
        Ok(result)
    }

    pub async fn explain(&self, drg_code: &str) -> Result<DrgExplanation> {
        let options = RequestOptions::new().locale("en,ar");
        let endpoint = endpoint_path("/drg/explain", &[drg_code])?;
        let response = self.executor.get_json(&endpoint, options).await?;
        let mut explanation: DrgExplanation = serde_json::from_value(response)?;
        explanation.drg_code = drg_code.to_string();
        Ok(explanation)
    }

    /// Group the base coding, then each alternative in order, and compare
    /// every alternative against the base.
    pub async fn compare_options(
        &self,
        base: &DrgInput,
        alternatives: &[DrgAlternative],
    ) -> Result<DrgComparisonReport> {
        let base_result = self.calculate_ar_drg(base).await?;

        let mut comparisons = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let result = self.calculate_ar_drg(&alternative.apply(base)).await?;
            comparisons.push(DrgComparison::between(&base_result, &result, alternative));
        }

        let best = best_option(&comparisons).cloned();
        info!(
            alternatives = comparisons.len(),
            best = best.as_ref().map(|option| option.scenario.as_str()).unwrap_or("none"),
            "DRG comparison complete"
        );
        Ok(DrgComparisonReport { base_scenario: base_result, comparisons, best_option: best })
    }
}
