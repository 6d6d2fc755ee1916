//! Teaching scenarios, graded student coding and learning paths.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::connector::RequestExecutor;

const TARGET_PROFICIENCY: &str = "expert";
const LEARNING_PATH_WEEKS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioRequest {
    #[serde(rename = "type")]
    pub scenario_type: String,
    pub difficulty: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub patient: Value,
    #[serde(default)]
    pub clinical_data: Value,
    #[serde(default)]
    pub competencies: Vec<String>,
}

pub fn build_scenario_request(request: &ScenarioRequest) -> Value {
    json!({
        "scenario_type": request.scenario_type,
        "difficulty_level": request.difficulty,
        "learning_objectives": request.objectives,
        "patient_profile": request.patient,
        "clinical_scenario": request.clinical_data,
        "target_competencies": request.competencies,
        "saudi_context": true,
        "bilingual_support": true,
    })
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientStory {
    #[serde(default)]
    pub narrative: String,
    pub narrative_ar: Option<String>,
    #[serde(default)]
    pub clinical_details: Value,
    #[serde(default)]
    pub documentation: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingChallenge {
    #[serde(rename(deserialize = "type"))]
    pub challenge_type: String,
    #[serde(default)]
    pub description: String,
    pub description_ar: Option<String>,
    #[serde(default)]
    pub hints: Vec<Value>,
    #[serde(default)]
    pub expected_codes: Vec<Value>,
    #[serde(default)]
    pub common_mistakes: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationalScenario {
    pub scenario_id: String,
    #[serde(default)]
    pub title: String,
    pub title_ar: Option<String>,
    #[serde(default)]
    pub patient_story: PatientStory,
    #[serde(rename(deserialize = "challenges"), default)]
    pub coding_challenges: Vec<CodingChallenge>,
    #[serde(rename(deserialize = "resources"), default)]
    pub learning_resources: Vec<Value>,
    #[serde(rename(deserialize = "assessment"), default)]
    pub assessment_criteria: Value,
    #[serde(rename(deserialize = "drg_analysis"))]
    pub drg_impact_analysis: Option<Value>,
}

/// Codes a student submitted for a scenario.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentCodes {
    #[serde(default)]
    pub diagnoses: Vec<String>,
    #[serde(default)]
    pub procedures: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub sequence: Vec<String>,
}

pub fn build_student_validation_request(scenario_id: &str, codes: &StudentCodes) -> Value {
    json!({
        "scenario_id": scenario_id,
        "student_submission": {
            "diagnosis_codes": codes.diagnoses,
            "procedure_codes": codes.procedures,
            "modifiers": codes.modifiers,
            "sequencing": codes.sequence,
        },
        "validation_level": "comprehensive",
        "provide_feedback": true,
        "saudi_guidelines": true,
    })
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ComponentScores {
    pub diagnosis_accuracy: f64,
    pub procedure_accuracy: f64,
    pub sequencing_accuracy: f64,
    pub modifier_usage: f64,
}

impl ComponentScores {
    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("diagnosis_accuracy", self.diagnosis_accuracy),
            ("procedure_accuracy", self.procedure_accuracy),
            ("sequencing_accuracy", self.sequencing_accuracy),
            ("modifier_usage", self.modifier_usage),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub code: String,
    /// `correct`, `incorrect`, `missing` or `unnecessary`.
    pub status: String,
    #[serde(rename(deserialize = "message"), default)]
    pub feedback: String,
    #[serde(rename(deserialize = "message_ar"))]
    pub feedback_ar: Option<String>,
    #[serde(rename(deserialize = "suggestion"))]
    pub improvement_suggestion: Option<String>,
    #[serde(rename(deserialize = "guideline_reference"))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrgOutcomeComparison {
    pub student_drg: Value,
    pub expected_drg: Value,
    pub financial_impact: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodingValidation {
    pub overall_score: f64,
    pub component_scores: ComponentScores,
    pub detailed_feedback: Vec<FeedbackItem>,
    pub drg_comparison: Option<DrgOutcomeComparison>,
    pub learning_recommendations: Vec<Value>,
    pub competency_assessment: Value,
    pub next_steps: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawScore {
    #[serde(default)]
    overall: f64,
    #[serde(default)]
    diagnosis: f64,
    #[serde(default)]
    procedure: f64,
    #[serde(default)]
    sequencing: f64,
    #[serde(default)]
    modifiers: f64,
}

#[derive(Debug, Deserialize)]
struct RawDrgAnalysis {
    #[serde(default)]
    student_result: Value,
    #[serde(default)]
    expected_result: Value,
    #[serde(default)]
    financial_difference: Value,
}

#[derive(Debug, Deserialize)]
struct RawCodingValidation {
    score: RawScore,
    #[serde(default)]
    feedback: Vec<FeedbackItem>,
    drg_analysis: Option<RawDrgAnalysis>,
    #[serde(default)]
    recommendations: Vec<Value>,
    #[serde(default)]
    competency_progress: Option<Value>,
    #[serde(default)]
    next_steps: Vec<Value>,
}

impl From<RawCodingValidation> for CodingValidation {
    fn from(raw: RawCodingValidation) -> Self {
        Self {
            overall_score: raw.score.overall,
            component_scores: ComponentScores {
                diagnosis_accuracy: raw.score.diagnosis,
                procedure_accuracy: raw.score.procedure,
                sequencing_accuracy: raw.score.sequencing,
                modifier_usage: raw.score.modifiers,
            },
            detailed_feedback: raw.feedback,
            drg_comparison: raw.drg_analysis.map(|analysis| DrgOutcomeComparison {
                student_drg: analysis.student_result,
                expected_drg: analysis.expected_result,
                financial_impact: analysis.financial_difference,
            }),
            learning_recommendations: raw.recommendations,
            competency_assessment: raw.competency_progress.unwrap_or_else(|| json!({})),
            next_steps: raw.next_steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub week: u32,
    #[serde(default)]
    pub title: String,
    pub title_ar: Option<String>,
    #[serde(default)]
    pub objectives: Vec<Value>,
    #[serde(default)]
    pub activities: Vec<Value>,
    #[serde(default)]
    pub assessments: Vec<Value>,
    #[serde(default)]
    pub resources: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    #[serde(rename(deserialize = "path_id"))]
    pub learning_path_id: String,
    #[serde(rename(deserialize = "duration_weeks"))]
    pub estimated_duration: Option<u32>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(rename(deserialize = "scenarios"), default)]
    pub practice_scenarios: Vec<Value>,
    #[serde(rename(deserialize = "tracking_metrics"), default)]
    pub progress_tracking: Value,
}

pub fn build_learning_path_request(code_system: &str, current_level: &str) -> Value {
    json!({
        "code_system": code_system,
        "current_competency": current_level,
        "target_proficiency": TARGET_PROFICIENCY,
        "saudi_focus": true,
        "timeframe_weeks": LEARNING_PATH_WEEKS,
    })
}

/// Competency a learning module should build a path for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleCompetency {
    pub id: String,
    pub code_system: String,
    pub current_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub scenarios: Vec<ScenarioRequest>,
    #[serde(default)]
    pub competencies: Vec<ModuleCompetency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningModule {
    pub module_id: String,
    pub title: String,
    pub scenarios: Vec<EducationalScenario>,
    /// Learning path per competency id.
    pub learning_paths: BTreeMap<String, LearningPath>,
}

/// One graded submission for progress tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub scenario_id: String,
    pub codes: StudentCodes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub submission_id: String,
    pub validation: CodingValidation,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyRecommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub priority: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProgress {
    pub student_id: String,
    pub module_id: String,
    pub overall_score: f64,
    pub individual_results: Vec<SubmissionResult>,
    /// Average per component score across submissions.
    pub competency_progress: BTreeMap<String, f64>,
    pub recommendations: Vec<StudyRecommendation>,
}

/// Incorrect codes sharing a three-character category needed before a
/// focus-area recommendation is made.
const FOCUS_AREA_THRESHOLD: usize = 2;
const HIGH_PRIORITY_THRESHOLD: usize = 3;

/// Aggregate graded submissions into a progress report.
pub fn summarize_progress(
    student_id: &str,
    module_id: &str,
    results: Vec<SubmissionResult>,
) -> StudentProgress {
    let overall_score = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.validation.overall_score).sum::<f64>() / results.len() as f64
    };

    let mut component_totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for result in &results {
        for (name, score) in result.validation.component_scores.named() {
            let entry = component_totals.entry(name.to_string()).or_default();
            entry.0 += score;
            entry.1 += 1;
        }
    }
    let competency_progress = component_totals
        .into_iter()
        .map(|(name, (total, count))| (name, total / count as f64))
        .collect();

    let mut error_categories: BTreeMap<String, usize> = BTreeMap::new();
    for result in &results {
        for item in &result.validation.detailed_feedback {
            if item.status == "incorrect" {
                let category: String = item.code.chars().take(3).collect();
                *error_categories.entry(category).or_default() += 1;
            }
        }
    }
    let recommendations = error_categories
        .into_iter()
        .filter(|(_, count)| *count >= FOCUS_AREA_THRESHOLD)
        .map(|(category, count)| StudyRecommendation {
            kind: "focus_area".into(),
            message: format!("Review coding guidelines for {category} category codes"),
            priority: if count >= HIGH_PRIORITY_THRESHOLD { "high" } else { "medium" }.into(),
            resources: vec![
                format!("3M Encoder guidance for {category}"),
                format!("Saudi-specific examples for {category}"),
            ],
        })
        .collect();

    StudentProgress {
        student_id: student_id.to_string(),
        module_id: module_id.to_string(),
        overall_score,
        individual_results: results,
        competency_progress,
        recommendations,
    }
}

pub struct EducationService {
    executor: Arc<RequestExecutor>,
}

impl EducationService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn create_scenario(&self, request: &ScenarioRequest) -> Result<EducationalScenario> {
        let body = build_scenario_request(request);
        let response = self.executor.post_json("/education/create-scenario", &body).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn validate_student_coding(
        &self,
        scenario_id: &str,
        codes: &StudentCodes,
    ) -> Result<CodingValidation> {
        let body = build_student_validation_request(scenario_id, codes);
        let response = self.executor.post_json("/education/validate-coding", &body).await?;
        let raw: RawCodingValidation = serde_json::from_value(response)?;
        Ok(raw.into())
    }

    pub async fn learning_path(
        &self,
        code_system: &str,
        current_level: &str,
    ) -> Result<LearningPath> {
        let body = build_learning_path_request(code_system, current_level);
        let response = self.executor.post_json("/education/learning-path", &body).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Create every scenario of a module, then one learning path per
    /// competency. Calls run one after another.
    pub async fn create_learning_module(
        &self,
        module: &ModuleDefinition,
    ) -> Result<LearningModule> {
        let mut scenarios = Vec::with_capacity(module.scenarios.len());
        for scenario in &module.scenarios {
            scenarios.push(self.create_scenario(scenario).await?);
        }

        let mut learning_paths = BTreeMap::new();
        for competency in &module.competencies {
            let path =
                self.learning_path(&competency.code_system, &competency.current_level).await?;
            learning_paths.insert(competency.id.clone(), path);
        }

        info!(module_id = %module.id, scenarios = scenarios.len(), "learning module created");
        Ok(LearningModule {
            module_id: module.id.clone(),
            title: module.title.clone(),
            scenarios,
            learning_paths,
        })
    }

    /// Grade each submission in order and aggregate the results.
    pub async fn validate_student_progress(
        &self,
        student_id: &str,
        module_id: &str,
        submissions: &[Submission],
        now: DateTime<Utc>,
    ) -> Result<StudentProgress> {
        let mut results = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let validation =
                self.validate_student_coding(&submission.scenario_id, &submission.codes).await?;
            results.push(SubmissionResult {
                submission_id: submission.id.clone(),
                validation,
                timestamp: now,
            });
        }
        Ok(summarize_progress(student_id, module_id, results))
    }
}
