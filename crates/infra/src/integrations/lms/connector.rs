//! Learning management system facade.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use medcode_core::{Clock, EventBus};
use medcode_domain::config::LmsConfig;
use medcode_domain::constants::LMS_SCOPE;
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::assessment::{AssessmentRequest, AssessmentService, Competency, CompetencyAssessment};
use super::content::{BilingualUpload, ContentService, ContentUpload};
use super::course::{CertificationPathway, CourseRequest, CourseService};
use super::gradebook::GradebookService;
use super::resource_id;
use super::users::{Enrollment, StudentProfile, UserService};
use crate::connector::{
    AccessTokenProvider, AuthScheme, ConnectorEvent, CredentialConfig, CredentialManager,
    ExecutorConfig, RequestExecutor,
};

pub const PLATFORM: &str = "Blackboard";

/// Everything needed to stand up a complete medical-coding course.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CourseBlueprint {
    pub course: CourseRequest,
    #[serde(default)]
    pub competency_framework: Vec<Competency>,
    #[serde(default)]
    pub content_items: Vec<ContentUpload>,
    #[serde(default)]
    pub assessments: Vec<AssessmentRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedCourse {
    pub course: Value,
    pub competency_columns: Vec<Value>,
    pub content: Vec<BilingualUpload>,
    pub assessments: Vec<CompetencyAssessment>,
}

pub struct LmsConnector {
    credentials: Arc<CredentialManager>,
    events: EventBus<ConnectorEvent>,
    clock: Arc<dyn Clock>,
    courses: CourseService,
    content: ContentService,
    assessments: AssessmentService,
    gradebook: GradebookService,
    users: UserService,
}

impl LmsConnector {
    pub fn new(config: &LmsConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let base_url = config.api_base_url();
        let events = EventBus::new();

        let credentials = Arc::new(CredentialManager::new(
            CredentialConfig {
                platform: PLATFORM.to_string(),
                token_url: format!("{base_url}/oauth2/token"),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scope: Some(LMS_SCOPE.to_string()),
                scheme: AuthScheme::Basic,
                timeout: config.timeout(),
            },
            Arc::clone(&clock),
            events.clone(),
        )?);

        let executor_config = ExecutorConfig::new(PLATFORM, base_url.as_str())
            .timeout(config.timeout())
            .max_attempts(config.retry_attempts as usize)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        let auth: Arc<dyn AccessTokenProvider> = credentials.clone();
        let executor = Arc::new(RequestExecutor::new(executor_config, auth, events.clone())?);

        info!(base_url = %base_url, "lms connector configured");

        let english = config.english_locale.as_str();
        let arabic = config.arabic_locale.as_str();
        Ok(Self {
            credentials,
            events,
            clock,
            courses: CourseService::new(Arc::clone(&executor), english, arabic),
            content: ContentService::new(Arc::clone(&executor), english, arabic),
            assessments: AssessmentService::new(Arc::clone(&executor)),
            gradebook: GradebookService::new(Arc::clone(&executor)),
            users: UserService::new(executor, arabic),
        })
    }

    pub fn events(&self) -> &EventBus<ConnectorEvent> {
        &self.events
    }

    pub async fn authenticate(&self) -> Result<()> {
        self.credentials.authenticate().await?;
        Ok(())
    }

    pub async fn ensure_authenticated(&self) -> Result<()> {
        self.credentials.ensure_authenticated().await?;
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated().await
    }

    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.credentials.expires_at().await
    }

    pub fn courses(&self) -> &CourseService {
        &self.courses
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }

    pub fn assessments(&self) -> &AssessmentService {
        &self.assessments
    }

    pub fn gradebook(&self) -> &GradebookService {
        &self.gradebook
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub async fn create_medical_coding_course(&self, course: &CourseRequest) -> Result<Value> {
        self.courses.create_bilingual_course(course).await
    }

    pub async fn upload_compliant_content(
        &self,
        course_id: &str,
        upload: &ContentUpload,
    ) -> Result<BilingualUpload> {
        self.content.upload_compliant_content(course_id, upload, self.clock.now()).await
    }

    pub async fn create_competency_assessment(
        &self,
        course_id: &str,
        request: &AssessmentRequest,
    ) -> Result<CompetencyAssessment> {
        self.assessments.create_competency_assessment(course_id, request).await
    }

    pub async fn enroll_student(
        &self,
        course_id: &str,
        profile: &StudentProfile,
        pathway: &CertificationPathway,
    ) -> Result<Enrollment> {
        self.users.enroll_student(course_id, profile, pathway, self.clock.now()).await
    }

    /// Course, competency columns, content and assessments in that order.
    /// Stops at the first failure.
    pub async fn provision_course(&self, blueprint: &CourseBlueprint) -> Result<ProvisionedCourse> {
        let course = self.create_medical_coding_course(&blueprint.course).await?;
        let course_id = resource_id(&course)?;

        let competency_columns = self
            .gradebook
            .setup_competency_gradebook(&course_id, &blueprint.competency_framework)
            .await?;

        let mut content = Vec::with_capacity(blueprint.content_items.len());
        for item in &blueprint.content_items {
            content.push(self.upload_compliant_content(&course_id, item).await?);
        }

        let mut assessments = Vec::with_capacity(blueprint.assessments.len());
        for assessment in &blueprint.assessments {
            assessments.push(self.create_competency_assessment(&course_id, assessment).await?);
        }

        info!(course_id = %course_id, "course provisioned");
        Ok(ProvisionedCourse { course, competency_columns, content, assessments })
    }
}
