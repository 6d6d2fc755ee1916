//! Lab manager: owns active sessions and the archive of completed reports.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use medcode_domain::{LabType, MedCodeError, Result};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::info;

use super::session::{LabEvent, LabSession, LabSessionConfig, LabSessionDeps, SessionReport};
use crate::events::EventBus;

/// Session handle shared between the manager and its callers.
pub type SharedSession = Arc<Mutex<LabSession>>;

struct ActiveSession {
    student_id: String,
    session: SharedSession,
}

/// Filter for [`LabManager::session_history`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub student_id: Option<String>,
    pub lab_type: Option<LabType>,
    pub completed_from: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    fn matches(&self, report: &SessionReport) -> bool {
        self.student_id.as_ref().map_or(true, |id| &report.student_id == id)
            && self.lab_type.as_ref().map_or(true, |lab| &report.lab_type == lab)
            && self.completed_from.map_or(true, |from| report.completed_at >= from)
    }
}

pub struct LabManager {
    deps: LabSessionDeps,
    active: Arc<DashMap<String, ActiveSession>>,
    history: Arc<RwLock<Vec<SessionReport>>>,
    events: EventBus<LabEvent>,
}

impl LabManager {
    pub fn new(deps: LabSessionDeps) -> Self {
        Self {
            deps,
            active: Arc::new(DashMap::new()),
            history: Arc::new(RwLock::new(Vec::new())),
            events: EventBus::new(),
        }
    }

    /// Manager-level events: `session_started`, `session_completed` and
    /// `session_error` forwarded from every session.
    pub fn events(&self) -> &EventBus<LabEvent> {
        &self.events
    }

    /// Create and initialize a session. Only sessions that reach `Active`
    /// are registered.
    ///
    /// # Errors
    /// Propagates the initialization failure; the `session_error` event is
    /// still forwarded.
    pub async fn create_session(&self, config: LabSessionConfig) -> Result<SharedSession> {
        let student_id = config.student_id.clone();
        let mut session = LabSession::new(config, self.deps.clone());
        self.wire_session_events(&session);

        session.initialize().await?;

        let id = session.id().to_string();
        let shared = Arc::new(Mutex::new(session));
        self.active.insert(id.clone(), ActiveSession { student_id, session: Arc::clone(&shared) });
        info!(session_id = %id, active = self.active.len(), "lab session registered");
        Ok(shared)
    }

    fn wire_session_events(&self, session: &LabSession) {
        let forward = self.events.clone();
        session.events().subscribe("session_started", move |event| forward.emit(event));

        let forward = self.events.clone();
        session.events().subscribe("session_error", move |event| forward.emit(event));

        let forward = self.events.clone();
        let active = Arc::clone(&self.active);
        let history = Arc::clone(&self.history);
        session.events().subscribe("session_completed", move |event| {
            if let LabEvent::SessionCompleted(report) = event {
                history.write().push(report.clone());
                active.remove(&report.session_id);
            }
            forward.emit(event);
        });
    }

    pub fn get_session(&self, session_id: &str) -> Option<SharedSession> {
        self.active.get(session_id).map(|entry| Arc::clone(&entry.session))
    }

    pub fn active_sessions(&self) -> Vec<SharedSession> {
        self.active.iter().map(|entry| Arc::clone(&entry.session)).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn student_sessions(&self, student_id: &str) -> Vec<SharedSession> {
        self.active
            .iter()
            .filter(|entry| entry.student_id == student_id)
            .map(|entry| Arc::clone(&entry.session))
            .collect()
    }

    /// Complete an active session and drop it from the active set.
    ///
    /// # Errors
    /// `NotFound` if no active session has this id; completion errors are
    /// propagated.
    pub async fn terminate_session(&self, session_id: &str) -> Result<SessionReport> {
        let session = self
            .get_session(session_id)
            .ok_or_else(|| MedCodeError::NotFound(format!("lab session {session_id}")))?;

        let report = session.lock().await.complete_session().await?;
        self.active.remove(session_id);
        Ok(report)
    }

    /// Archived reports matching `filter`, oldest first.
    pub fn session_history(&self, filter: &HistoryFilter) -> Vec<SessionReport> {
        self.history.read().iter().filter(|report| filter.matches(report)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use medcode_domain::{CodeEntry, CodeSystem, EhrSystem, LabState};

    use super::*;
    use crate::coding::CodeValidationService;
    use crate::lab::simulator::SimulatorFactory;
    use crate::time::{Clock, MockClock};

    fn manager(clock: &MockClock) -> LabManager {
        let clock: Arc<dyn Clock> = Arc::new(clock.clone());
        LabManager::new(LabSessionDeps {
            factory: Arc::new(SimulatorFactory::new(Arc::clone(&clock))),
            validator: CodeValidationService::internal_only(),
            clock,
        })
    }

    #[tokio::test]
    async fn completion_archives_report_and_removes_session() {
        let clock = MockClock::new();
        let manager = manager(&clock);
        let completed = Arc::new(parking_lot::Mutex::new(0));
        let counter = Arc::clone(&completed);
        manager.events().subscribe("session_completed", move |_| *counter.lock() += 1);

        let session = manager
            .create_session(LabSessionConfig::new("student-1", "inpatient_coding"))
            .await
            .expect("session");
        let id = session.lock().await.id().to_string();
        assert!(manager.get_session(&id).is_some());

        {
            let mut guard = session.lock().await;
            guard.enter_code(CodeEntry::new("I21.9", CodeSystem::Icd10)).await;
            guard.complete_session().await.expect("report");
        }

        assert!(manager.get_session(&id).is_none());
        assert_eq!(manager.active_count(), 0);
        assert_eq!(*completed.lock(), 1);

        let history = manager.session_history(&HistoryFilter::default());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].codes_entered, 1);
    }

    #[tokio::test]
    async fn terminate_completes_and_returns_report() {
        let clock = MockClock::new();
        let manager = manager(&clock);
        let session = manager
            .create_session(LabSessionConfig::new("student-2", "ehr_navigation"))
            .await
            .expect("session");
        let id = session.lock().await.id().to_string();

        let report = manager.terminate_session(&id).await.expect("terminate");
        assert_eq!(report.student_id, "student-2");
        assert_eq!(session.lock().await.state(), LabState::Completed);
        assert!(matches!(
            manager.terminate_session(&id).await,
            Err(MedCodeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn student_sessions_filter_active_set() {
        let clock = MockClock::new();
        let manager = manager(&clock);
        for student in ["alice", "alice", "bob"] {
            manager
                .create_session(LabSessionConfig::new(student, "ehr_navigation"))
                .await
                .expect("session");
        }
        assert_eq!(manager.student_sessions("alice").len(), 2);
        assert_eq!(manager.student_sessions("bob").len(), 1);
        assert_eq!(manager.active_sessions().len(), 3);
    }

    #[tokio::test]
    async fn failed_initialization_is_not_registered() {
        let clock = MockClock::new();
        let manager = manager(&clock);
        let errors = Arc::new(parking_lot::Mutex::new(0));
        let counter = Arc::clone(&errors);
        manager.events().subscribe("session_error", move |_| *counter.lock() += 1);

        let result = manager
            .create_session(
                LabSessionConfig::new("student-3", "ehr_navigation")
                    .with_ehr_system(EhrSystem::EpicSandbox),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(manager.active_count(), 0);
        assert_eq!(*errors.lock(), 1);
    }

    #[tokio::test]
    async fn history_filters_by_student_lab_type_and_date() {
        let clock = MockClock::new();
        let manager = manager(&clock);
        let checkpoint = clock.now() + Duration::hours(1);

        for (student, lab) in [("alice", "ehr_navigation"), ("bob", "inpatient_coding")] {
            let session = manager
                .create_session(LabSessionConfig::new(student, lab))
                .await
                .expect("session");
            let id = session.lock().await.id().to_string();
            manager.terminate_session(&id).await.expect("terminate");
        }

        clock.advance(Duration::hours(2));
        let session = manager
            .create_session(LabSessionConfig::new("alice", "inpatient_coding"))
            .await
            .expect("session");
        let id = session.lock().await.id().to_string();
        manager.terminate_session(&id).await.expect("terminate");

        let alice = HistoryFilter { student_id: Some("alice".into()), ..Default::default() };
        assert_eq!(manager.session_history(&alice).len(), 2);

        let inpatient =
            HistoryFilter { lab_type: Some(LabType::InpatientCoding), ..Default::default() };
        assert_eq!(manager.session_history(&inpatient).len(), 2);

        let recent = HistoryFilter { completed_from: Some(checkpoint), ..Default::default() };
        let recent = manager.session_history(&recent);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].student_id, "alice");
    }
}
