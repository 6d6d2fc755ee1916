//! Course content: bilingual uploads with coding-compliance checks and
//! virtual lab links.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use medcode_core::coding::formats::{is_valid_icd10, is_valid_schi};
use medcode_domain::{MedCodeError, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::resource_id;
use crate::connector::{RequestExecutor, RequestOptions};

/// LMS content handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Folder,
    Lesson,
    Assignment,
    Assessment,
    Discussion,
    VirtualLab,
    Video,
    Document,
    Scorm,
}

impl ContentKind {
    pub fn handler(self) -> &'static str {
        match self {
            Self::Folder => "resource/x-bb-folder",
            Self::Lesson => "resource/x-bb-lesson",
            Self::Assignment => "resource/x-bb-assignment",
            Self::Assessment => "resource/x-bb-qti-test",
            Self::Discussion => "resource/x-bb-discussionboard",
            Self::VirtualLab => "resource/x-bb-externallink",
            Self::Video => "resource/x-bb-video",
            Self::Document => "resource/x-bb-document",
            Self::Scorm => "resource/x-bb-scorm",
        }
    }
}

/// Elements every uploaded coding lesson must reference.
pub const REQUIRED_ELEMENTS: [&str; 4] =
    ["icd_10_am_references", "schi_coding_examples", "hl7_fhir_compliance", "mds_alignment"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodingExample {
    /// `diagnosis` or `procedure`; other kinds are not checked.
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

/// English/Arabic content pair to upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentUpload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub title_ar: String,
    #[serde(default)]
    pub body_ar: String,
    #[serde(default)]
    pub kind: Option<ContentKind>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub adaptive_release: Option<Value>,
    #[serde(default)]
    pub icd_10_am_references: Option<Value>,
    #[serde(default)]
    pub schi_coding_examples: Option<Value>,
    #[serde(default)]
    pub hl7_fhir_compliance: Option<Value>,
    #[serde(default)]
    pub mds_alignment: Option<Value>,
    #[serde(default)]
    pub coding_examples: Vec<CodingExample>,
}

impl ContentUpload {
    fn element(&self, name: &str) -> Option<&Value> {
        match name {
            "icd_10_am_references" => self.icd_10_am_references.as_ref(),
            "schi_coding_examples" => self.schi_coding_examples.as_ref(),
            "hl7_fhir_compliance" => self.hl7_fhir_compliance.as_ref(),
            "mds_alignment" => self.mds_alignment.as_ref(),
            _ => None,
        }
    }
}

/// Null, `false`, zero and empty strings count as absent.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Number(number)) => number.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate_content_compliance(content: &ContentUpload) -> ComplianceReport {
    let mut errors = Vec::new();
    for element in REQUIRED_ELEMENTS {
        if !is_present(content.element(element)) {
            errors.push(format!("Missing required NPHIES element: {element}"));
        }
    }
    for example in &content.coding_examples {
        match example.kind.as_str() {
            "diagnosis" if !is_valid_icd10(&example.code) => {
                errors.push(format!("Invalid ICD-10-AM code: {}", example.code));
            }
            "procedure" if !is_valid_schi(&example.code) => {
                errors.push(format!("Invalid SCHI code: {}", example.code));
            }
            _ => {}
        }
    }
    ComplianceReport { compliant: errors.is_empty(), errors, warnings: Vec::new() }
}

/// Body of a single content item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewContent<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub parent_id: Option<&'a str>,
    pub kind: Option<ContentKind>,
    pub adaptive_release: Option<&'a Value>,
}

pub fn build_content_request(content: &NewContent<'_>) -> Value {
    json!({
        "title": content.title,
        "body": content.body,
        "parentId": content.parent_id,
        "contentHandler": { "id": content.kind.unwrap_or(ContentKind::Lesson).handler() },
        "availability": {
            "available": "Yes",
            "allowGuests": false,
            "adaptiveRelease": content.adaptive_release.cloned().unwrap_or_else(|| json!({})),
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualLink {
    pub relationship: String,
    pub english_content_id: String,
    pub arabic_content_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BilingualUpload {
    pub english: Value,
    pub arabic: Value,
    pub link: BilingualLink,
    pub nphies_compliant: bool,
    pub validation_results: ComplianceReport,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VirtualLabContent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub lab_type: String,
    pub ehr_system: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub prerequisite_competencies: Vec<String>,
    #[serde(default)]
    pub nphies_integration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualLabUpload {
    pub content: Value,
    /// Lab descriptors kept alongside the link.
    pub metadata: Value,
}

pub fn build_virtual_lab_request(lab: &VirtualLabContent) -> Value {
    json!({
        "title": lab.title,
        "body": lab.description,
        "contentHandler": { "id": ContentKind::VirtualLab.handler() },
        "launchInNewWindow": true,
        "availability": { "available": "Yes" },
    })
}

pub struct ContentService {
    executor: Arc<RequestExecutor>,
    english_locale: String,
    arabic_locale: String,
}

impl ContentService {
    pub fn new(executor: Arc<RequestExecutor>, english_locale: &str, arabic_locale: &str) -> Self {
        Self {
            executor,
            english_locale: english_locale.to_string(),
            arabic_locale: arabic_locale.to_string(),
        }
    }

    /// Create one item in `locale`.
    pub async fn create_content(
        &self,
        course_id: &str,
        content: &NewContent<'_>,
        locale: &str,
    ) -> Result<Value> {
        let options = RequestOptions::json(build_content_request(content)).locale(locale);
        let endpoint = format!("/courses/{course_id}/contents");
        self.executor.send_json(Method::POST, &endpoint, options).await
    }

    /// Upload the English item and its Arabic twin under the same parent.
    ///
    /// # Errors
    /// `InvalidInput` without any request when the content fails
    /// [`validate_content_compliance`].
    pub async fn upload_compliant_content(
        &self,
        course_id: &str,
        upload: &ContentUpload,
        now: DateTime<Utc>,
    ) -> Result<BilingualUpload> {
        let report = validate_content_compliance(upload);
        if !report.compliant {
            return Err(MedCodeError::InvalidInput(format!(
                "Content not NPHIES compliant: {}",
                report.errors.join(", ")
            )));
        }

        let english = NewContent {
            title: &upload.title,
            body: &upload.body,
            parent_id: upload.parent_id.as_deref(),
            kind: upload.kind,
            adaptive_release: upload.adaptive_release.as_ref(),
        };
        let english = self.create_content(course_id, &english, &self.english_locale).await?;

        let parent_id = english.get("parentId").and_then(Value::as_str);
        let arabic = NewContent {
            title: &upload.title_ar,
            body: &upload.body_ar,
            parent_id,
            kind: upload.kind,
            adaptive_release: upload.adaptive_release.as_ref(),
        };
        let arabic = self.create_content(course_id, &arabic, &self.arabic_locale).await?;

        let link = BilingualLink {
            relationship: "bilingual_pair".to_string(),
            english_content_id: resource_id(&english)?,
            arabic_content_id: resource_id(&arabic)?,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        info!(
            course_id,
            english = %link.english_content_id,
            arabic = %link.arabic_content_id,
            "bilingual content uploaded"
        );

        Ok(BilingualUpload {
            english,
            arabic,
            link,
            nphies_compliant: true,
            validation_results: report,
        })
    }

    pub async fn upload_virtual_lab(
        &self,
        course_id: &str,
        lab: &VirtualLabContent,
    ) -> Result<VirtualLabUpload> {
        let endpoint = format!("/courses/{course_id}/contents");
        let content = self.executor.post_json(&endpoint, &build_virtual_lab_request(lab)).await?;
        let metadata = json!({
            "lab_type": lab.lab_type,
            "ehr_system": lab.ehr_system,
            "duration_minutes": lab.duration_minutes,
            "learning_objectives": lab.learning_objectives,
            "prerequisite_competencies": lab.prerequisite_competencies,
            "nphies_integration": lab.nphies_integration,
        });
        Ok(VirtualLabUpload { content, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compliant_upload() -> ContentUpload {
        ContentUpload {
            title: "ICD-10-AM basics".into(),
            title_ar: "أساسيات".into(),
            icd_10_am_references: Some(json!(["ACS 0001"])),
            schi_coding_examples: Some(json!(true)),
            hl7_fhir_compliance: Some(json!("R4")),
            mds_alignment: Some(json!({ "version": "3.1" })),
            coding_examples: vec![
                CodingExample { kind: "diagnosis".into(), code: "I21.9".into() },
                CodingExample { kind: "procedure".into(), code: "SCHI-12345".into() },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn compliant_content_passes() {
        let report = validate_content_compliance(&compliant_upload());
        assert!(report.compliant);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn missing_elements_and_bad_codes_are_reported() {
        let upload = ContentUpload {
            mds_alignment: Some(json!(false)),
            hl7_fhir_compliance: Some(json!("")),
            coding_examples: vec![
                CodingExample { kind: "diagnosis".into(), code: "i21".into() },
                CodingExample { kind: "procedure".into(), code: "12345".into() },
                CodingExample { kind: "note".into(), code: "anything".into() },
            ],
            ..compliant_upload()
        };
        let report = validate_content_compliance(&upload);
        assert!(!report.compliant);
        assert_eq!(
            report.errors,
            vec![
                "Missing required NPHIES element: hl7_fhir_compliance",
                "Missing required NPHIES element: mds_alignment",
                "Invalid ICD-10-AM code: i21",
                "Invalid SCHI code: 12345",
            ]
        );
    }

    #[test]
    fn content_request_defaults_to_lesson_handler() {
        let body = build_content_request(&NewContent { title: "T", ..Default::default() });
        assert_eq!(body["contentHandler"]["id"], "resource/x-bb-lesson");
        assert_eq!(body["availability"]["allowGuests"], false);
        assert_eq!(body["availability"]["adaptiveRelease"], json!({}));
    }

    #[test]
    fn virtual_lab_is_an_external_link() {
        let lab = VirtualLabContent { title: "EHR lab".into(), ..Default::default() };
        let body = build_virtual_lab_request(&lab);
        assert_eq!(body["contentHandler"]["id"], "resource/x-bb-externallink");
        assert_eq!(body["launchInNewWindow"], true);
    }
}
