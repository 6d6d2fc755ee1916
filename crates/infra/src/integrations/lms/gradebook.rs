//! Competency columns and progress updates in the course gradebook.

use std::sync::Arc;

use medcode_domain::{MedCodeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::assessment::Competency;
use crate::connector::{RequestExecutor, RequestOptions};

/// Score at which a competency counts as achieved.
pub const MASTERY_THRESHOLD: f64 = 95.0;
const PROGRESS_THRESHOLD: f64 = 80.0;

pub fn build_competency_column(competency: &Competency) -> Value {
    let required = (competency.required_accuracy * 100.0).round();
    json!({
        "name": competency.name,
        "description": competency.description,
        "displayName": format!("{} ({required}%)", competency.name),
        "scoreProviderHandle": "numeric",
        "score": { "possible": 100 },
        "availability": { "available": "Yes" },
        "grading": { "type": "Attempts", "attempts": 0 },
    })
}

pub fn competency_feedback(score: f64, competency_id: &str) -> String {
    if score >= MASTERY_THRESHOLD {
        format!(
            "Excellent! You have achieved mastery in {competency_id}. This competency is now \
             marked as complete for certification purposes."
        )
    } else if score >= PROGRESS_THRESHOLD {
        format!(
            "Good progress on {competency_id}. Continue practicing to reach the 95% mastery \
             threshold required for certification."
        )
    } else {
        format!(
            "Additional study recommended for {competency_id}. Review the learning materials \
             and practice exercises to improve your understanding."
        )
    }
}

pub fn build_progress_update(score: f64, competency_id: &str) -> Value {
    json!({
        "score": score,
        "text": if score >= MASTERY_THRESHOLD { "Achieved" } else { "In Progress" },
        "feedback": competency_feedback(score, competency_id),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradebookColumn {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ColumnPage {
    #[serde(default)]
    results: Vec<GradebookColumn>,
}

pub struct GradebookService {
    executor: Arc<RequestExecutor>,
}

impl GradebookService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn setup_competency_gradebook(
        &self,
        course_id: &str,
        competencies: &[Competency],
    ) -> Result<Vec<Value>> {
        let endpoint = format!("/courses/{course_id}/gradebook/columns");
        let mut columns = Vec::with_capacity(competencies.len());
        for competency in competencies {
            let column =
                self.executor.post_json(&endpoint, &build_competency_column(competency)).await?;
            columns.push(column);
        }
        Ok(columns)
    }

    pub async fn columns(&self, course_id: &str) -> Result<Vec<GradebookColumn>> {
        let endpoint = format!("/courses/{course_id}/gradebook/columns");
        let response = self.executor.get_json(&endpoint, RequestOptions::new()).await?;
        let page: ColumnPage = serde_json::from_value(response)?;
        Ok(page.results)
    }

    /// Record `score` in the first column whose name contains
    /// `competency_id`.
    ///
    /// # Errors
    /// `NotFound` when no column matches.
    pub async fn update_competency_progress(
        &self,
        course_id: &str,
        user_id: &str,
        competency_id: &str,
        score: f64,
    ) -> Result<Value> {
        let column = self
            .columns(course_id)
            .await?
            .into_iter()
            .find(|column| column.name.contains(competency_id))
            .ok_or_else(|| {
                MedCodeError::NotFound(format!("Competency column not found: {competency_id}"))
            })?;

        let endpoint =
            format!("/courses/{course_id}/gradebook/columns/{}/users/{user_id}", column.id);
        self.executor.patch_json(&endpoint, &build_progress_update(score, competency_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_display_name_shows_required_accuracy() {
        let competency = Competency {
            id: "C1".into(),
            name: "C1 Diagnosis coding".into(),
            required_accuracy: 0.95,
            ..Default::default()
        };
        let column = build_competency_column(&competency);
        assert_eq!(column["displayName"], "C1 Diagnosis coding (95%)");
        assert_eq!(column["score"]["possible"], 100);
    }

    #[test]
    fn feedback_bands() {
        assert!(competency_feedback(95.0, "C1").starts_with("Excellent!"));
        assert!(competency_feedback(80.0, "C1").starts_with("Good progress on C1"));
        assert!(competency_feedback(79.9, "C1").starts_with("Additional study"));
    }

    #[test]
    fn progress_text_marks_mastery() {
        assert_eq!(build_progress_update(96.0, "C1")["text"], "Achieved");
        assert_eq!(build_progress_update(94.0, "C1")["text"], "In Progress");
    }
}
