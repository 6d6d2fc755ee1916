//! Clinical indicator extraction from free-text documentation.

use std::sync::Arc;

use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connector::RequestExecutor;

const FIND_TYPES: [&str; 6] = [
    "diagnoses",
    "procedures",
    "medications",
    "symptoms",
    "anatomical_sites",
    "temporal_indicators",
];

const IMPROVEMENT_FOCUS: [&str; 4] =
    ["specificity", "completeness", "coding_optimization", "saudi_documentation_standards"];

/// `ar` when the text contains any character of the Arabic block, else `en`.
pub fn detect_language(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
        "ar"
    } else {
        "en"
    }
}

pub fn build_findings_request(document_text: &str) -> Value {
    json!({
        "document_text": document_text,
        "language": detect_language(document_text),
        "find_types": FIND_TYPES,
        "saudi_medical_terms": true,
        "arabic_support": true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisFinding {
    #[serde(rename(deserialize = "original_text"))]
    pub text: String,
    pub normalized_term: Option<String>,
    #[serde(rename(deserialize = "icd10_codes"), default)]
    pub icd10_suggestions: Vec<Value>,
    pub confidence: Option<f64>,
    #[serde(rename(deserialize = "text_position"))]
    pub position: Option<Value>,
    #[serde(rename(deserialize = "negated"), default)]
    pub negation_detected: bool,
    #[serde(rename(deserialize = "temporal_info"))]
    pub temporal_context: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureFinding {
    #[serde(rename(deserialize = "original_text"))]
    pub text: String,
    pub normalized_term: Option<String>,
    #[serde(rename(deserialize = "schi_codes"), default)]
    pub schi_suggestions: Vec<Value>,
    #[serde(rename(deserialize = "cpt_codes"), default)]
    pub cpt_suggestions: Vec<Value>,
    pub confidence: Option<f64>,
    #[serde(rename(deserialize = "text_position"))]
    pub position: Option<Value>,
    #[serde(rename(deserialize = "body_site"))]
    pub anatomical_site: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Findings {
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisFinding>,
    #[serde(default)]
    pub procedures: Vec<ProcedureFinding>,
    #[serde(default)]
    pub medications: Vec<Value>,
    #[serde(default)]
    pub symptoms: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentQuality {
    #[serde(rename(deserialize = "completeness"))]
    pub completeness_score: Option<f64>,
    #[serde(rename(deserialize = "specificity"))]
    pub specificity_score: Option<f64>,
    pub coding_potential: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalFindings {
    pub document_id: String,
    #[serde(rename(deserialize = "language"))]
    pub language_detected: Option<String>,
    #[serde(default)]
    pub findings: Findings,
    #[serde(rename(deserialize = "quality"), default)]
    pub quality_metrics: DocumentQuality,
    #[serde(default)]
    pub recommendations: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementOpportunity {
    pub category: String,
    #[serde(rename(deserialize = "current"))]
    pub current_state: Option<Value>,
    #[serde(rename(deserialize = "recommended"))]
    pub recommended_change: Option<Value>,
    pub impact: Option<Value>,
    pub priority: Option<String>,
    #[serde(default)]
    pub examples: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationImprovements {
    #[serde(rename(deserialize = "opportunities"))]
    pub improvement_opportunities: Vec<ImprovementOpportunity>,
    #[serde(rename(deserialize = "gaps"), default)]
    pub documentation_gaps: Vec<Value>,
    #[serde(rename(deserialize = "coding_tips"), default)]
    pub coding_optimization_tips: Vec<Value>,
    #[serde(rename(deserialize = "saudi_recommendations"), default)]
    pub saudi_specific_recommendations: Vec<Value>,
}

pub struct ClinicalFinderService {
    executor: Arc<RequestExecutor>,
}

impl ClinicalFinderService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn find_indicators(&self, document_text: &str) -> Result<ClinicalFindings> {
        let body = build_findings_request(document_text);
        let response = self.executor.post_json("/clinical-finder/analyze", &body).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn documentation_improvements(
        &self,
        findings: &ClinicalFindings,
    ) -> Result<DocumentationImprovements> {
        let body = json!({
            "findings": findings,
            "improvement_focus": IMPROVEMENT_FOCUS,
        });
        let response = self.executor.post_json("/clinical-finder/improvements", &body).await?;
        Ok(serde_json::from_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_arabic_script() {
        assert_eq!(detect_language("ألم في الصدر"), "ar");
        assert_eq!(detect_language("Patient reports chest pain, ألم"), "ar");
        assert_eq!(detect_language("chest pain"), "en");
        assert_eq!(detect_language(""), "en");
    }

    #[test]
    fn findings_request_sets_language() {
        let body = build_findings_request("ألم");
        assert_eq!(body["language"], "ar");
        assert_eq!(body["find_types"].as_array().map(Vec::len), Some(6));
    }

    #[test]
    fn findings_map_platform_field_names() {
        let findings: ClinicalFindings = serde_json::from_value(json!({
            "document_id": "doc-1",
            "language": "en",
            "findings": {
                "diagnoses": [
                    { "original_text": "MI", "icd10_codes": ["I21.9"], "negated": false }
                ],
                "procedures": [{ "original_text": "PCI", "body_site": "heart" }]
            },
            "quality": { "completeness": 0.8 }
        }))
        .expect("decode");
        assert_eq!(findings.findings.diagnoses[0].text, "MI");
        assert_eq!(findings.findings.procedures[0].anatomical_site.as_deref(), Some("heart"));
        assert_eq!(findings.quality_metrics.completeness_score, Some(0.8));
    }
}
