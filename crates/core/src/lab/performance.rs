//! Session activity log entries and the metrics derived from them.

use chrono::{DateTime, Utc};
use medcode_domain::{CodeSystem, CodeValidation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of student action recorded in the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PatientLookup,
    ClinicalDataAccess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub details: Value,
    /// Time the backend took to answer, in milliseconds.
    pub response_time: u64,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub timestamp: DateTime<Utc>,
    pub code: String,
    #[serde(rename = "type")]
    pub system: CodeSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub time_to_enter: u64,
    pub validation: CodeValidation,
}

/// Metrics computed when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub coding_accuracy: f64,
    pub efficiency_score: f64,
    pub average_response_time: f64,
    pub total_actions: usize,
    pub total_codes: usize,
    /// Milliseconds between session start and the evaluation instant.
    pub session_duration: u64,
}

/// Actions per minute that earn a full efficiency score.
const FULL_EFFICIENCY_ACTIONS_PER_MINUTE: f64 = 10.0;

/// Derive metrics from the session logs. Pure: the same logs and instants
/// always give the same summary.
pub fn summarize(
    actions: &[ActionRecord],
    codes: &[CodeRecord],
    started_at: DateTime<Utc>,
    evaluated_at: DateTime<Utc>,
) -> PerformanceSummary {
    let duration_ms = (evaluated_at - started_at).num_milliseconds().max(0) as u64;

    let valid_codes = codes.iter().filter(|record| record.validation.valid).count();
    let coding_accuracy =
        if codes.is_empty() { 0.0 } else { valid_codes as f64 / codes.len() as f64 };

    let efficiency_score = if actions.is_empty() {
        0.0
    } else {
        let minutes = duration_ms.max(1) as f64 / 60_000.0;
        let per_minute = actions.len() as f64 / minutes;
        (per_minute / FULL_EFFICIENCY_ACTIONS_PER_MINUTE).min(1.0)
    };

    let average_response_time = if actions.is_empty() {
        0.0
    } else {
        actions.iter().map(|record| record.response_time as f64).sum::<f64>()
            / actions.len() as f64
    };

    PerformanceSummary {
        coding_accuracy,
        efficiency_score,
        average_response_time,
        total_actions: actions.len(),
        total_codes: codes.len(),
        session_duration: duration_ms,
    }
}
