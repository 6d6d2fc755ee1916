//! Competency-based assessments.

use std::sync::Arc;

use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::content::ContentKind;
use super::resource_id;
use crate::connector::RequestExecutor;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Competency {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Share of correct answers needed, 0..=1.
    #[serde(rename = "requiredAccuracy", default)]
    pub required_accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice,
    ScenarioBased,
    PracticalCoding,
    CaseAnalysis,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 4] =
        [Self::MultipleChoice, Self::ScenarioBased, Self::PracticalCoding, Self::CaseAnalysis];

    pub fn points(self) -> f64 {
        match self {
            Self::MultipleChoice => 1.0,
            Self::ScenarioBased => 5.0,
            Self::PracticalCoding => 10.0,
            Self::CaseAnalysis => 15.0,
        }
    }

    /// LMS question type.
    pub fn question_type(self) -> &'static str {
        match self {
            Self::MultipleChoice => "MultipleChoice",
            Self::ScenarioBased | Self::CaseAnalysis => "Essay",
            Self::PracticalCoding => "ShortAnswer",
        }
    }
}

pub fn build_question(kind: QuestionKind, competency: &Competency) -> Value {
    let points = kind.points();
    let mut question = match kind {
        QuestionKind::MultipleChoice => json!({
            "title": format!("{} - Multiple Choice", competency.name),
            "body": "Which coding system is primarily used for diagnoses in Saudi Arabia's \
                     NPHIES platform?",
            "bodyAr": "ما هو نظام الترميز المستخدم بشكل أساسي للتشخيص في منصة نفيس السعودية؟",
            "answers": [
                { "text": "ICD-10-AM", "textAr": "ICD-10-AM", "correct": true },
                { "text": "ICD-10-CM", "textAr": "ICD-10-CM", "correct": false },
                { "text": "CPT", "textAr": "CPT", "correct": false },
                { "text": "SNOMED CT", "textAr": "SNOMED CT", "correct": false },
            ],
        }),
        QuestionKind::ScenarioBased => json!({
            "title": format!("{} - Scenario Analysis", competency.name),
            "body": "A 45-year-old patient presents with chest pain. After examination and \
                     tests, the physician diagnoses acute myocardial infarction. The patient \
                     undergoes cardiac catheterization with angioplasty. Provide the appropriate \
                     ICD-10-AM diagnosis code and SCHI procedure code for this scenario.",
            "bodyAr": "مريض يبلغ من العمر 45 عامًا يعاني من ألم في الصدر. \
                       بعد الفحص والاختبارات، يشخص الطبيب احتشاء عضلة القلب الحاد. \
                       يخضع المريض لقسطرة القلب مع رأب الأوعية. \
                       قدم رمز التشخيص ICD-10-AM المناسب ورمز الإجراء SCHI لهذا السيناريو.",
            "rubric": {
                "diagnosis_code": {
                    "points": points * 0.5,
                    "description": "Correct ICD-10-AM diagnosis code",
                },
                "procedure_code": {
                    "points": points * 0.3,
                    "description": "Correct SCHI procedure code",
                },
                "rationale": {
                    "points": points * 0.2,
                    "description": "Clear explanation of code selection",
                },
            },
        }),
        QuestionKind::PracticalCoding => json!({
            "title": format!("{} - Practical Coding", competency.name),
            "body": "Code the following procedure performed in a Saudi healthcare facility: \
                     \"Laparoscopic appendectomy with removal of appendix through umbilical \
                     port.\" Provide the SCHI code and explain your reasoning.",
            "bodyAr": "قم بترميز الإجراء التالي الذي تم إجراؤه في منشأة صحية سعودية: \
                       \"استئصال الزائدة الدودية بالمنظار مع إزالة الزائدة عبر السرة.\" \
                       قدم رمز SCHI واشرح منطقك.",
            "expectedAnswer": "SCHI-1234 (example)",
            "partialCreditRules": {
                "correct_code": points * 0.7,
                "correct_approach": points * 0.2,
                "explanation": points * 0.1,
            },
        }),
        QuestionKind::CaseAnalysis => json!({
            "title": format!("{} - Complex Case Analysis", competency.name),
            "body": "Analyze the following complex medical case and provide complete coding \
                     with NPHIES compliance: [Complex case scenario with multiple diagnoses and \
                     procedures]",
            "bodyAr": "حلل الحالة الطبية المعقدة التالية وقدم ترميزًا كاملاً متوافقًا مع نفيس: \
                       [سيناريو حالة معقدة متعددة التشخيصات والإجراءات]",
            "complexityLevel": "advanced",
        }),
    };
    question["type"] = json!(kind.question_type());
    question["points"] = json!(points);
    question["competency_id"] = json!(competency.id);
    question["nphies_aligned"] = json!(true);
    question
}

/// One question of each kind for every competency, in competency order.
pub fn competency_questions(competencies: &[Competency]) -> Vec<Value> {
    competencies
        .iter()
        .flat_map(|competency| {
            QuestionKind::ALL.iter().map(move |kind| build_question(*kind, competency))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub competencies: Vec<Competency>,
    #[serde(default)]
    pub certification_pathways: Vec<String>,
}

pub fn build_assessment_request(request: &AssessmentRequest) -> Value {
    json!({
        "title": request.title,
        "body": request.instructions,
        "contentHandler": { "id": ContentKind::Assessment.handler() },
        "availability": { "available": "Yes" },
    })
}

/// Three attempts with partial credit and automated feedback.
pub fn build_scoring_settings(request: &AssessmentRequest) -> Value {
    json!({
        "scoring": {
            "competency_based": true,
            "partial_credit": true,
            "nphies_validation": true,
            "automated_feedback": true,
            "certification_tracking": request.certification_pathways,
        },
        "availability": {
            "available": "Yes",
            "allowMultipleAttempts": true,
            "numberOfAttempts": 3,
        },
        "grading": {
            "type": "Attempts",
            "anonymousGrading": { "type": "None" },
        },
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetencyAssessment {
    pub assessment: Value,
    pub questions: Vec<Value>,
    pub settings: Value,
}

pub struct AssessmentService {
    executor: Arc<RequestExecutor>,
}

impl AssessmentService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Create the assessment item, add its questions and apply the scoring
    /// settings.
    pub async fn create_competency_assessment(
        &self,
        course_id: &str,
        request: &AssessmentRequest,
    ) -> Result<CompetencyAssessment> {
        let contents = format!("/courses/{course_id}/contents");
        let assessment =
            self.executor.post_json(&contents, &build_assessment_request(request)).await?;
        let assessment_id = resource_id(&assessment)?;

        let questions = competency_questions(&request.competencies);
        let questions_endpoint = format!("{contents}/{assessment_id}/questions");
        for question in &questions {
            self.executor.post_json(&questions_endpoint, question).await?;
        }

        let settings_endpoint = format!("{contents}/{assessment_id}/settings");
        let settings =
            self.executor.patch_json(&settings_endpoint, &build_scoring_settings(request)).await?;

        info!(
            course_id,
            assessment_id = %assessment_id,
            questions = questions.len(),
            "competency assessment created"
        );
        Ok(CompetencyAssessment { assessment, questions, settings })
    }
}
