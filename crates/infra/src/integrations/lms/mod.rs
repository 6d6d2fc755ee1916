//! Learning management system integration
//!
//! Bilingual (English/Arabic) medical-coding courses: course and menu
//! provisioning, compliant content uploads, competency assessments, gradebook
//! progress and student enrollment. Arabic requests carry the Arabic locale
//! in `Accept-Language`.

pub mod assessment;
pub mod connector;
pub mod content;
pub mod course;
pub mod gradebook;
pub mod users;

use medcode_domain::{MedCodeError, Result};
use serde_json::Value;

pub use assessment::{AssessmentRequest, AssessmentService, Competency, CompetencyAssessment};
pub use connector::{CourseBlueprint, LmsConnector, ProvisionedCourse};
pub use content::{
    validate_content_compliance, BilingualUpload, ComplianceReport, ContentKind, ContentService,
    ContentUpload, VirtualLabContent,
};
pub use course::{CertificationPathway, CourseRequest, CourseService};
pub use gradebook::GradebookService;
pub use users::{Enrollment, StudentProfile, UserService};

/// `id` of a created LMS object.
pub(crate) fn resource_id(value: &Value) -> Result<String> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| MedCodeError::Serialization("LMS response has no id".to_string()))
}
