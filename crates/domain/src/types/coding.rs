//! Code entry and validation result types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coding system a submitted code belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodeSystem {
    Icd10,
    Cpt,
    Hcpcs,
    Schi,
    Other(String),
}

impl CodeSystem {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Icd10 => "ICD10",
            Self::Cpt => "CPT",
            Self::Hcpcs => "HCPCS",
            Self::Schi => "SCHI",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for CodeSystem {
    fn from(value: &str) -> Self {
        match value {
            "ICD10" => Self::Icd10,
            "CPT" => Self::Cpt,
            "HCPCS" => Self::Hcpcs,
            "SCHI" => Self::Schi,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CodeSystem {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<CodeSystem> for String {
    fn from(value: CodeSystem) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code submitted by a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    #[serde(rename = "type")]
    pub system: CodeSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl CodeEntry {
    pub fn new(code: impl Into<String>, system: impl Into<CodeSystem>) -> Self {
        Self { code: code.into(), system: system.into(), context: None }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Where a [`CodeValidation`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    InternalValidation,
    ExternalValidation,
}

/// Result of validating a single code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeValidation {
    pub valid: bool,
    pub accuracy: f64,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reimbursement_impact: Option<Value>,
    pub source: ValidationSource,
}

/// Structured result of a dedicated validation operation. Invalid input is
/// reported here rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Default for ValidationOutcome {
    fn default() -> Self {
        Self { valid: true, errors: Vec::new(), warnings: Vec::new() }
    }
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the outcome becomes invalid.
    pub fn error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: ValidationOutcome) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
