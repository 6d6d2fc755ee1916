//! Bilingual course provisioning.

use std::sync::Arc;

use medcode_domain::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::content::ContentKind;
use super::resource_id;
use crate::connector::{RequestExecutor, RequestOptions};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CertificationPathway {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target_completion_date: Option<String>,
    #[serde(default)]
    pub required_competencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CourseRequest {
    pub external_id: String,
    pub course_id: String,
    pub name_en: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub enrollment_start: Option<String>,
    #[serde(default)]
    pub enrollment_end: Option<String>,
    #[serde(default)]
    pub certification_pathways: Vec<CertificationPathway>,
}

pub fn build_course_request(course: &CourseRequest, english_locale: &str) -> Value {
    json!({
        "externalId": course.external_id,
        "courseId": course.course_id,
        "name": course.name_en,
        "description": course.description_en,
        "locale": { "id": english_locale },
        "availability": {
            "available": "Yes",
            "duration": {
                "type": "DateRange",
                "start": course.start_date,
                "end": course.end_date,
            },
        },
        "enrollment": {
            "type": "InstructorLed",
            "start": course.enrollment_start,
            "end": course.enrollment_end,
        },
    })
}

pub fn build_arabic_folder_request(course: &CourseRequest) -> Value {
    json!({
        "title": course.name_ar.as_deref().unwrap_or("المحتوى العربي"),
        "body": course.description_ar.as_deref().unwrap_or("وصف الدورة باللغة العربية"),
        "contentHandler": { "id": ContentKind::Folder.handler() },
        "availability": { "available": "Yes" },
    })
}

pub fn build_pathway_column(pathway: &CertificationPathway) -> Value {
    let name = format!("{} Progress", pathway.name);
    json!({
        "name": name,
        "description": format!("Certification progress for {}", pathway.name),
        "displayName": name,
        "scoreProviderHandle": "numeric",
        "score": { "possible": 100 },
        "availability": { "available": "Yes" },
        "grading": {
            "type": "Attempts",
            "attempts": 0,
            "anonymousGrading": { "type": "None" },
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub title: &'static str,
    pub title_ar: &'static str,
    pub kind: ContentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuSection {
    pub title: &'static str,
    pub title_ar: &'static str,
    pub children: &'static [MenuItem],
}

const fn item(title: &'static str, title_ar: &'static str, kind: ContentKind) -> MenuItem {
    MenuItem { title, title_ar, kind }
}

/// Folder tree created in every medical-coding course. Tracking entries are
/// plain folders.
pub const MEDICAL_CODING_MENU: [MenuSection; 6] = [
    MenuSection {
        title: "Course Information / معلومات الدورة",
        title_ar: "معلومات الدورة",
        children: &[
            item("Syllabus / المنهج", "المنهج", ContentKind::Document),
            item("Learning Objectives / أهداف التعلم", "أهداف التعلم", ContentKind::Document),
            item("Assessment Criteria / معايير التقييم", "معايير التقييم", ContentKind::Document),
        ],
    },
    MenuSection {
        title: "Foundation Modules / الوحدات الأساسية",
        title_ar: "الوحدات الأساسية",
        children: &[
            item("Healthcare System Fundamentals", "أساسيات النظام الصحي", ContentKind::Lesson),
            item("Anatomy and Physiology", "التشريح ووظائف الأعضاء", ContentKind::Lesson),
            item("Medical Terminology", "المصطلحات الطبية", ContentKind::Lesson),
            item("Healthcare Documentation", "التوثيق الصحي", ContentKind::Lesson),
        ],
    },
    MenuSection {
        title: "NPHIES Integration / تكامل نفيس",
        title_ar: "تكامل نفيس",
        children: &[
            item("NPHIES Overview", "نظرة عامة على نفيس", ContentKind::Lesson),
            item("ICD-10-AM Coding", "ترميز ICD-10-AM", ContentKind::Lesson),
            item("SCHI Procedures", "إجراءات SCHI", ContentKind::Lesson),
            item("HL7 FHIR Standards", "معايير HL7 FHIR", ContentKind::Lesson),
        ],
    },
    MenuSection {
        title: "Virtual Labs / المختبرات الافتراضية",
        title_ar: "المختبرات الافتراضية",
        children: &[
            item("EHR Navigation Lab", "مختبر التنقل في السجل الطبي", ContentKind::VirtualLab),
            item("Coding Practice Lab", "مختبر ممارسة الترميز", ContentKind::VirtualLab),
            item("NPHIES Simulation", "محاكاة نفيس", ContentKind::VirtualLab),
        ],
    },
    MenuSection {
        title: "Assessments / التقييمات",
        title_ar: "التقييمات",
        children: &[
            item("Competency Assessments", "تقييمات الكفاءة", ContentKind::Assessment),
            item("Practical Exams", "الامتحانات العملية", ContentKind::Assessment),
            item("Certification Prep", "إعداد الشهادة", ContentKind::Assessment),
        ],
    },
    MenuSection {
        title: "Certification Tracking / تتبع الشهادة",
        title_ar: "تتبع الشهادة",
        children: &[
            item("AAPC Pathway", "مسار AAPC", ContentKind::Folder),
            item("AHIMA Pathway", "مسار AHIMA", ContentKind::Folder),
            item("ICD-10-AM Certification", "شهادة ICD-10-AM", ContentKind::Folder),
        ],
    },
];

pub fn build_menu_folder_request(section: &MenuSection) -> Value {
    json!({
        "title": section.title,
        "contentHandler": { "id": ContentKind::Folder.handler() },
        "availability": { "available": "Yes" },
    })
}

pub fn build_menu_item_request(item: &MenuItem, parent_id: &str) -> Value {
    json!({
        "title": item.title,
        "parentId": parent_id,
        "contentHandler": { "id": item.kind.handler() },
        "availability": { "available": "Yes" },
    })
}

pub struct CourseService {
    executor: Arc<RequestExecutor>,
    english_locale: String,
    arabic_locale: String,
}

impl CourseService {
    pub fn new(executor: Arc<RequestExecutor>, english_locale: &str, arabic_locale: &str) -> Self {
        Self {
            executor,
            english_locale: english_locale.to_string(),
            arabic_locale: arabic_locale.to_string(),
        }
    }

    /// Create the course, then its Arabic folder, the menu tree and one
    /// gradebook column per certification pathway. Returns the created course.
    pub async fn create_bilingual_course(&self, course: &CourseRequest) -> Result<Value> {
        let body = build_course_request(course, &self.english_locale);
        let created = self.executor.post_json("/courses", &body).await?;
        let course_id = resource_id(&created)?;

        self.add_arabic_folder(&course_id, course).await?;
        self.create_medical_coding_menu(&course_id).await?;
        self.setup_certification_tracking(&course_id, &course.certification_pathways).await?;

        info!(course_id = %course_id, "bilingual course created");
        Ok(created)
    }

    pub async fn add_arabic_folder(
        &self,
        course_id: &str,
        course: &CourseRequest,
    ) -> Result<Value> {
        let options =
            RequestOptions::json(build_arabic_folder_request(course)).locale(&self.arabic_locale);
        let endpoint = format!("/courses/{course_id}/contents");
        self.executor.send_json(Method::POST, &endpoint, options).await
    }

    pub async fn create_medical_coding_menu(&self, course_id: &str) -> Result<()> {
        let endpoint = format!("/courses/{course_id}/contents");
        for section in &MEDICAL_CODING_MENU {
            let folder =
                self.executor.post_json(&endpoint, &build_menu_folder_request(section)).await?;
            let parent_id = resource_id(&folder)?;
            for child in section.children {
                let body = build_menu_item_request(child, &parent_id);
                self.executor.post_json(&endpoint, &body).await?;
            }
            debug!(course_id, section = section.title, "menu section created");
        }
        Ok(())
    }

    pub async fn setup_certification_tracking(
        &self,
        course_id: &str,
        pathways: &[CertificationPathway],
    ) -> Result<()> {
        let endpoint = format!("/courses/{course_id}/gradebook/columns");
        for pathway in pathways {
            self.executor.post_json(&endpoint, &build_pathway_column(pathway)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_request_uses_english_locale_and_dates() {
        let course = CourseRequest {
            external_id: "MC-101".into(),
            course_id: "mc101".into(),
            name_en: "Medical Coding".into(),
            start_date: Some("2024-09-01".into()),
            ..Default::default()
        };
        let body = build_course_request(&course, "en_US");
        assert_eq!(body["locale"]["id"], "en_US");
        assert_eq!(body["availability"]["duration"]["start"], "2024-09-01");
        assert_eq!(body["enrollment"]["type"], "InstructorLed");
    }

    #[test]
    fn arabic_folder_falls_back_to_default_titles() {
        let body = build_arabic_folder_request(&CourseRequest::default());
        assert_eq!(body["title"], "المحتوى العربي");
        assert_eq!(body["contentHandler"]["id"], "resource/x-bb-folder");
    }

    #[test]
    fn menu_has_six_sections_with_typed_children() {
        assert_eq!(MEDICAL_CODING_MENU.len(), 6);
        let children: usize = MEDICAL_CODING_MENU.iter().map(|s| s.children.len()).sum();
        assert_eq!(children, 20);

        let lab = &MEDICAL_CODING_MENU[3].children[0];
        let body = build_menu_item_request(lab, "folder-1");
        assert_eq!(body["contentHandler"]["id"], "resource/x-bb-externallink");
        assert_eq!(body["parentId"], "folder-1");
    }

    #[test]
    fn pathway_column_is_numeric_out_of_100() {
        let pathway =
            CertificationPathway { id: "p1".into(), name: "AHIMA".into(), ..Default::default() };
        let body = build_pathway_column(&pathway);
        assert_eq!(body["name"], "AHIMA Progress");
        assert_eq!(body["score"]["possible"], 100);
        assert_eq!(body["grading"]["anonymousGrading"]["type"], "None");
    }
}
