//! Student accounts and enrollment.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use medcode_domain::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::course::CertificationPathway;
use super::resource_id;
use crate::connector::{endpoint_path, RequestExecutor, RequestOptions};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    pub username: String,
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    /// Falls back to the Arabic locale.
    #[serde(default)]
    pub preferred_language: Option<String>,
}

pub fn build_user_request(profile: &StudentProfile, default_locale: &str) -> Value {
    json!({
        "userName": profile.username,
        "name": { "given": profile.given_name, "family": profile.family_name },
        "contact": { "email": profile.email },
        "locale": { "id": profile.preferred_language.as_deref().unwrap_or(default_locale) },
        "availability": { "available": "Yes" },
    })
}

pub fn build_enrollment_request(user_id: &str) -> Value {
    json!({
        "userId": user_id,
        "courseRoleId": "Student",
        "availability": { "available": "Yes" },
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayAssignment {
    pub pathway_id: String,
    pub pathway_name: String,
    pub target_completion_date: Option<String>,
    pub required_competencies: Vec<String>,
    pub assigned_date: String,
}

impl PathwayAssignment {
    pub fn new(pathway: &CertificationPathway, now: DateTime<Utc>) -> Self {
        Self {
            pathway_id: pathway.id.clone(),
            pathway_name: pathway.name.clone(),
            target_completion_date: pathway.target_completion_date.clone(),
            required_competencies: pathway.required_competencies.clone(),
            assigned_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrollment {
    pub user: Value,
    pub enrollment: Value,
    pub certification_pathway: PathwayAssignment,
}

pub struct UserService {
    executor: Arc<RequestExecutor>,
    default_locale: String,
}

impl UserService {
    pub fn new(executor: Arc<RequestExecutor>, default_locale: &str) -> Self {
        Self { executor, default_locale: default_locale.to_string() }
    }

    /// Existing account by user name, or a new one when the lookup fails.
    pub async fn find_or_create_user(&self, profile: &StudentProfile) -> Result<Value> {
        let lookup = endpoint_path("/users", &[format!("userName:{}", profile.username)])?;
        match self.executor.get_json(&lookup, RequestOptions::new()).await {
            Ok(user) => Ok(user),
            Err(err) => {
                debug!(username = %profile.username, error = %err, "user lookup failed, creating");
                let body = build_user_request(profile, &self.default_locale);
                self.executor.post_json("/users", &body).await
            }
        }
    }

    pub async fn enroll_student(
        &self,
        course_id: &str,
        profile: &StudentProfile,
        pathway: &CertificationPathway,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let user = self.find_or_create_user(profile).await?;
        let user_id = resource_id(&user)?;
        let endpoint = format!("/courses/{course_id}/users");
        let enrollment =
            self.executor.post_json(&endpoint, &build_enrollment_request(&user_id)).await?;
        Ok(Enrollment {
            user,
            enrollment,
            certification_pathway: PathwayAssignment::new(pathway, now),
        })
    }
}
