//! Record encoding, code validation and code completion.

use std::sync::Arc;

use medcode_domain::constants::{COUNTRY_CODE, CURRENCY, DRG_GROUPER, DRG_VERSION};
use medcode_domain::{CodeEntry, CodeSystem, Result, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::connector::{RequestExecutor, RequestOptions};

/// Diagnosis line of an encoding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub icd10_code: String,
    #[serde(default)]
    pub description: String,
    /// Present-on-admission flag; `U` when not given.
    #[serde(default)]
    pub poa: Option<String>,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// Procedure line of an encoding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureLine {
    #[serde(default)]
    pub icd10_pcs_code: Option<String>,
    #[serde(default)]
    pub schi_code: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub procedure_date: Option<String>,
    #[serde(default)]
    pub physician_id: Option<String>,
}

impl ProcedureLine {
    /// ICD-10-PCS code when present, otherwise the SCHI code.
    pub fn code(&self) -> Option<&str> {
        self.icd10_pcs_code.as_deref().or(self.schi_code.as_deref())
    }
}

/// Patient record submitted for encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingInput {
    pub patient_age: u32,
    pub patient_gender: String,
    pub admission_date: String,
    #[serde(default)]
    pub discharge_date: Option<String>,
    #[serde(default)]
    pub length_of_stay: Option<u32>,
    #[serde(default)]
    pub discharge_status: Option<String>,
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub procedures: Vec<ProcedureLine>,
    #[serde(default)]
    pub external_causes: Vec<Value>,
}

/// Build the `/encoder/encode` body.
pub fn build_encoding_request(input: &EncodingInput) -> Value {
    let diagnoses: Vec<Value> = input
        .diagnoses
        .iter()
        .map(|diagnosis| {
            json!({
                "code": diagnosis.icd10_code,
                "description": diagnosis.description,
                "present_on_admission": diagnosis.poa.as_deref().unwrap_or("U"),
                "sequence": diagnosis.sequence.unwrap_or(1),
            })
        })
        .collect();

    let procedures: Vec<Value> = input
        .procedures
        .iter()
        .map(|procedure| {
            json!({
                "code": procedure.code(),
                "description": procedure.description,
                "date": procedure.procedure_date,
                "physician": procedure.physician_id,
            })
        })
        .collect();

    json!({
        "patient": {
            "age": input.patient_age,
            "gender": input.patient_gender,
            "admission_date": input.admission_date,
            "discharge_date": input.discharge_date,
            "length_of_stay": input.length_of_stay,
            "discharge_status": input.discharge_status,
        },
        "diagnoses": diagnoses,
        "procedures": procedures,
        "external_causes": input.external_causes,
        "configuration": {
            "country": COUNTRY_CODE,
            "drg_version": DRG_VERSION,
            "grouper": DRG_GROUPER,
            "nphies_compliant": true,
        }
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedDrg {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub weight: f64,
    #[serde(rename = "type", default)]
    pub drg_type: Option<String>,
    /// Major diagnostic category.
    #[serde(default)]
    pub mdc: Option<String>,
    #[serde(default)]
    pub severity_level: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedReimbursement {
    #[serde(default)]
    pub base_rate: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub outlier_payments: Value,
}

fn default_currency() -> String {
    CURRENCY.to_string()
}

/// Normalized `/encoder/encode` answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingResult {
    pub encoding_id: String,
    pub drg: EncodedDrg,
    #[serde(default)]
    pub principal_diagnosis: Value,
    #[serde(default)]
    pub secondary_diagnoses: Value,
    #[serde(default)]
    pub procedures: Value,
    #[serde(rename(deserialize = "cc_mcc_list"), default)]
    pub complications_comorbidities: Value,
    #[serde(default)]
    pub quality_indicators: Value,
    pub reimbursement: EncodedReimbursement,
    #[serde(rename(deserialize = "messages"), default)]
    pub validation_messages: Vec<Value>,
    #[serde(default)]
    pub nphies_validation: Value,
}

/// Result for one code from `/encoder/validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeCheck {
    pub code: String,
    pub valid: bool,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub suggestions: Vec<Value>,
    #[serde(default)]
    pub warnings: Vec<Value>,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub saudi_compliant: Option<bool>,
    #[serde(default)]
    pub nphies_valid: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CodeCheckResponse {
    results: Vec<CodeCheck>,
}

/// Normalized `/encoder/validate` answer: the overall outcome plus the
/// per-code checks it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeValidationReport {
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    pub results: Vec<CodeCheck>,
}

fn message_text(message: &Value) -> String {
    match message {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl From<Vec<CodeCheck>> for CodeValidationReport {
    fn from(results: Vec<CodeCheck>) -> Self {
        let mut outcome = ValidationOutcome::new();
        for check in &results {
            if !check.valid {
                outcome.valid = false;
            }
            for error in &check.errors {
                outcome.error(format!("{}: {}", check.code, message_text(error)));
            }
            for warning in &check.warnings {
                outcome.warning(format!("{}: {}", check.code, message_text(warning)));
            }
        }
        Self { outcome, results }
    }
}

pub fn build_validation_request(codes: &[CodeEntry]) -> Value {
    let codes: Vec<Value> = codes
        .iter()
        .map(|entry| {
            json!({
                "value": entry.code,
                "type": entry.system,
                "context": entry.context,
            })
        })
        .collect();

    json!({
        "codes": codes,
        "validation_level": "comprehensive",
        "saudi_specific": true,
        "nphies_compliant": true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSuggestion {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub usage_frequency: Option<Value>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    suggestions: Vec<CodeSuggestion>,
}

/// Maximum number of completions requested per call.
const SUGGESTION_LIMIT: u32 = 10;

pub struct EncoderService {
    executor: Arc<RequestExecutor>,
}

impl EncoderService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn encode_record(&self, input: &EncodingInput) -> Result<EncodingResult> {
        let body = build_encoding_request(input);
        let response = self.executor.post_json("/encoder/encode", &body).await?;
        let mut result: EncodingResult = serde_json::from_value(response)?;
        result.reimbursement.currency = CURRENCY.to_string();
        debug!(encoding_id = %result.encoding_id, drg = %result.drg.code, "record encoded");
        Ok(result)
    }

    /// A 4xx answer becomes an invalid report with no per-code results.
    pub async fn validate_codes(&self, codes: &[CodeEntry]) -> Result<CodeValidationReport> {
        let body = build_validation_request(codes);
        match self.executor.post_json("/encoder/validate", &body).await {
            Ok(response) => {
                let parsed: CodeCheckResponse = serde_json::from_value(response)?;
                Ok(parsed.results.into())
            }
            Err(err) if err.is_client_rejection() => {
                let mut outcome = ValidationOutcome::new();
                outcome.error(format!("Code validation failed: {err}"));
                Ok(CodeValidationReport { outcome, results: Vec::new() })
            }
            Err(err) => Err(err),
        }
    }

    pub async fn code_suggestions(
        &self,
        partial: &str,
        system: &CodeSystem,
    ) -> Result<Vec<CodeSuggestion>> {
        let options = RequestOptions::new()
            .header("X-Query-Type", "code_completion")
            .query("partial", partial)
            .query("type", system)
            .query("limit", SUGGESTION_LIMIT)
            .query("saudi_context", true);
        let response = self.executor.get_json("/encoder/suggest", options).await?;
        let parsed: SuggestionResponse = serde_json::from_value(response)?;
        Ok(parsed.suggestions)
    }
}
