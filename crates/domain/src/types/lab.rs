//! Virtual lab vocabulary: lifecycle states, lab types and EHR backend tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MedCodeError;

/// Lifecycle state of a lab session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabState {
    Initializing,
    Active,
    Paused,
    Completed,
    Error,
}

impl LabState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Completed and Error sessions never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for LabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of practice exercise. Unrecognised names are kept verbatim so reports
/// echo what the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LabType {
    EhrNavigation,
    InpatientCoding,
    OutpatientEm,
    Custom(String),
}

impl LabType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EhrNavigation => "ehr_navigation",
            Self::InpatientCoding => "inpatient_coding",
            Self::OutpatientEm => "outpatient_em",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for LabType {
    fn from(value: &str) -> Self {
        match value {
            "ehr_navigation" => Self::EhrNavigation,
            "inpatient_coding" => Self::InpatientCoding,
            "outpatient_em" => Self::OutpatientEm,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for LabType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<LabType> for String {
    fn from(value: LabType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EHR backend a lab session runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EhrSystem {
    MeditechExpanse,
    EpicSandbox,
    OracleHealth,
    #[default]
    InternalSimulator,
}

impl EhrSystem {
    pub const ALL: [EhrSystem; 4] =
        [Self::MeditechExpanse, Self::EpicSandbox, Self::OracleHealth, Self::InternalSimulator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeditechExpanse => "meditech_expanse",
            Self::EpicSandbox => "epic_sandbox",
            Self::OracleHealth => "oracle_health",
            Self::InternalSimulator => "internal_simulator",
        }
    }
}

impl FromStr for EhrSystem {
    type Err = MedCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|system| system.as_str() == s)
            .ok_or_else(|| MedCodeError::InvalidInput(format!("Unsupported EHR system: {s}")))
    }
}

impl fmt::Display for EhrSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient as loaded into a lab session by an EHR backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub name: String,
    pub dob: String,
    pub mrn: String,
    pub system: EhrSystem,
}
