//! Coding guidance: free-text help, diagnosis sequencing and modifier advice.

use std::sync::Arc;

use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connector::RequestExecutor;

const DEFAULT_CODE_SYSTEMS: [&str; 3] = ["ICD10AM", "SCHI", "CPT"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssistQuery {
    pub text: String,
    #[serde(default)]
    pub text_ar: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub code_systems: Option<Vec<String>>,
    #[serde(default)]
    pub language: Option<String>,
}

pub fn build_assist_request(query: &AssistQuery) -> Value {
    let code_systems = query
        .code_systems
        .clone()
        .unwrap_or_else(|| DEFAULT_CODE_SYSTEMS.iter().map(|s| s.to_string()).collect());
    json!({
        "query": query.text,
        "query_ar": query.text_ar,
        "context": query.context.as_deref().unwrap_or("general"),
        "code_systems": code_systems,
        "saudi_specific": true,
        "language_preference": query.language.as_deref().unwrap_or("en"),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistSuggestion {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub description_ar: Option<String>,
    pub code_system: Option<String>,
    pub confidence: Option<f64>,
    pub rationale: Option<String>,
    pub rationale_ar: Option<String>,
    #[serde(rename(deserialize = "applicable_guidelines"), default)]
    pub guidelines: Vec<Value>,
    #[serde(rename(deserialize = "coding_examples"), default)]
    pub examples: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingTip {
    #[serde(rename(deserialize = "text"))]
    pub tip: String,
    #[serde(rename(deserialize = "text_ar"))]
    pub tip_ar: Option<String>,
    pub importance: Option<String>,
    #[serde(rename(deserialize = "guideline_source"))]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingHelp {
    pub query_id: String,
    pub confidence: Option<f64>,
    #[serde(rename(deserialize = "suggestions"))]
    pub primary_suggestions: Vec<AssistSuggestion>,
    #[serde(rename(deserialize = "alternatives"), default)]
    pub alternative_codes: Vec<Value>,
    #[serde(default)]
    pub related_concepts: Vec<Value>,
    #[serde(default)]
    pub coding_tips: Vec<CodingTip>,
    #[serde(rename(deserialize = "guidelines"), default)]
    pub guideline_references: Vec<Value>,
    #[serde(rename(deserialize = "nphies_specific_notes"), default)]
    pub nphies_notes: Vec<Value>,
}

/// Diagnosis to be sequenced. Patient context is taken from the first entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequencingDiagnosis {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub poa: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub patient_gender: Option<String>,
    #[serde(default)]
    pub encounter_type: Option<String>,
}

pub fn build_sequencing_request(diagnoses: &[SequencingDiagnosis]) -> Value {
    let first = diagnoses.first();
    let lines: Vec<Value> = diagnoses
        .iter()
        .map(|diagnosis| {
            json!({
                "code": diagnosis.code,
                "description": diagnosis.description,
                "present_on_admission": diagnosis.poa,
                "clinical_context": diagnosis.context,
            })
        })
        .collect();

    json!({
        "diagnoses": lines,
        "patient_context": {
            "age": first.and_then(|d| d.patient_age),
            "gender": first.and_then(|d| d.patient_gender.clone()),
            "encounter_type": first.and_then(|d| d.encounter_type.clone()),
        },
        "saudi_guidelines": true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencedCode {
    /// 1-based position in the recommended order.
    pub position: usize,
    pub code: String,
    pub description: String,
    pub rationale: Option<String>,
    pub rationale_ar: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencingAdvice {
    pub recommended_sequence: Vec<SequencedCode>,
    pub alternative_sequences: Vec<Value>,
    pub sequencing_rules_applied: Value,
    pub warnings: Vec<Value>,
    pub saudi_specific_considerations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSequenceItem {
    code: String,
    #[serde(default)]
    description: String,
    rationale: Option<String>,
    rationale_ar: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSequencing {
    sequence: Vec<RawSequenceItem>,
    #[serde(default)]
    alternatives: Vec<Value>,
    #[serde(default)]
    rules_applied: Value,
    #[serde(default)]
    warnings: Vec<Value>,
    #[serde(default)]
    saudi_considerations: Vec<Value>,
}

impl From<RawSequencing> for SequencingAdvice {
    fn from(raw: RawSequencing) -> Self {
        let recommended_sequence = raw
            .sequence
            .into_iter()
            .enumerate()
            .map(|(index, item)| SequencedCode {
                position: index + 1,
                code: item.code,
                description: item.description,
                rationale: item.rationale,
                rationale_ar: item.rationale_ar,
                confidence: item.confidence,
            })
            .collect();
        Self {
            recommended_sequence,
            alternative_sequences: raw.alternatives,
            sequencing_rules_applied: raw.rules_applied,
            warnings: raw.warnings,
            saudi_specific_considerations: raw.saudi_considerations,
        }
    }
}

/// Clinical context for modifier guidance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModifierContext {
    #[serde(default)]
    pub setting: Option<String>,
    #[serde(default)]
    pub provider_specialty: Option<String>,
    #[serde(default)]
    pub bilateral: bool,
    #[serde(default)]
    pub multiple_procedures: bool,
}

pub fn build_modifier_request(procedure_code: &str, context: &ModifierContext) -> Value {
    json!({
        "procedure_code": procedure_code,
        "clinical_context": context,
        "encounter_details": {
            "setting": context.setting,
            "provider_specialty": context.provider_specialty,
            "bilateral": context.bilateral,
            "multiple_procedures": context.multiple_procedures,
        },
        "saudi_billing_rules": true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierInfo {
    #[serde(rename(deserialize = "code"))]
    pub modifier_code: String,
    #[serde(default)]
    pub description: String,
    pub description_ar: Option<String>,
    pub applicability: Option<Value>,
    pub reimbursement_impact: Option<Value>,
    pub usage_rules: Option<Value>,
    #[serde(default)]
    pub saudi_specific: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierGuidance {
    #[serde(rename(deserialize = "modifiers"))]
    pub applicable_modifiers: Vec<ModifierInfo>,
    #[serde(rename(deserialize = "contraindicated"), default)]
    pub contraindicated_modifiers: Vec<Value>,
    #[serde(rename(deserialize = "examples"), default)]
    pub usage_examples: Vec<Value>,
    #[serde(default)]
    pub billing_notes: Vec<Value>,
}

pub struct CodeAssistService {
    executor: Arc<RequestExecutor>,
}

impl CodeAssistService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn coding_help(&self, query: &AssistQuery) -> Result<CodingHelp> {
        let response =
            self.executor.post_json("/codeassist/query", &build_assist_request(query)).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn sequencing_advice(
        &self,
        diagnoses: &[SequencingDiagnosis],
    ) -> Result<SequencingAdvice> {
        let body = build_sequencing_request(diagnoses);
        let response = self.executor.post_json("/codeassist/sequencing", &body).await?;
        let raw: RawSequencing = serde_json::from_value(response)?;
        Ok(raw.into())
    }

    pub async fn modifier_guidance(
        &self,
        procedure_code: &str,
        context: &ModifierContext,
    ) -> Result<ModifierGuidance> {
        let body = build_modifier_request(procedure_code, context);
        let response = self.executor.post_json("/codeassist/modifiers", &body).await?;
        Ok(serde_json::from_value(response)?)
    }
}
