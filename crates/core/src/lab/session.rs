//! Virtual lab session state machine.
//!
//! ```text
//! Initializing -> Active <-> Paused
//!                 Active|Paused -> Completed
//!  any non-terminal state -> Error
//! ```
//!
//! A session is driven by a single owner at a time (`&mut self`). Every
//! transition and student action is published on the session's [`EventBus`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use medcode_domain::{
    CodeEntry, CodeValidation, EhrSystem, LabState, LabType, MedCodeError, PatientRecord, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::performance::{self, ActionKind, ActionRecord, CodeRecord, PerformanceSummary};
use super::ports::{EhrConnector, EhrConnectorFactory, PatientCriteria};
use super::scenario::{scenario_for, LabScenario};
use crate::coding::CodeValidationService;
use crate::events::{Event, EventBus};
use crate::time::Clock;

/// Parameters for a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabSessionConfig {
    #[serde(default)]
    pub session_id: Option<String>,
    pub student_id: String,
    #[serde(default)]
    pub instructor_id: Option<String>,
    pub lab_type: LabType,
    #[serde(default)]
    pub ehr_system: EhrSystem,
}

impl LabSessionConfig {
    pub fn new(student_id: impl Into<String>, lab_type: impl Into<LabType>) -> Self {
        Self {
            session_id: None,
            student_id: student_id.into(),
            instructor_id: None,
            lab_type: lab_type.into(),
            ehr_system: EhrSystem::default(),
        }
    }

    pub fn with_ehr_system(mut self, system: EhrSystem) -> Self {
        self.ehr_system = system;
        self
    }
}

/// Final report produced by `complete_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(rename = "labType")]
    pub lab_type: LabType,
    #[serde(rename = "ehrSystem")]
    pub ehr_system: EhrSystem,
    /// Session length in milliseconds.
    pub duration: u64,
    pub performance: PerformanceSummary,
    pub actions_count: usize,
    pub codes_entered: usize,
    pub accuracy_score: f64,
    pub efficiency_score: f64,
    pub completed_at: DateTime<Utc>,
}

/// Events published by a lab session.
#[derive(Debug, Clone, PartialEq)]
pub enum LabEvent {
    SessionInitializing { session_id: String },
    EhrConnected { session_id: String, system: EhrSystem },
    ScenarioLoaded { session_id: String, patient: Option<String>, encounter: Option<String> },
    SessionStarted { session_id: String, ehr_system: EhrSystem, lab_type: LabType },
    SessionPaused { session_id: String },
    SessionResumed { session_id: String },
    UserAction { session_id: String, action: ActionRecord },
    CodeEntered { session_id: String, record: CodeRecord },
    SessionCompleted(SessionReport),
    SessionError { session_id: String, error: String },
}

impl Event for LabEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::SessionInitializing { .. } => "session_initializing",
            Self::EhrConnected { .. } => "ehr_connected",
            Self::ScenarioLoaded { .. } => "scenario_loaded",
            Self::SessionStarted { .. } => "session_started",
            Self::SessionPaused { .. } => "session_paused",
            Self::SessionResumed { .. } => "session_resumed",
            Self::UserAction { .. } => "user_action",
            Self::CodeEntered { .. } => "code_entered",
            Self::SessionCompleted(_) => "session_completed",
            Self::SessionError { .. } => "session_error",
        }
    }
}

/// Result of a student action against the EHR backend. Backend failures are
/// reported here instead of as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    fn ok(data: Value, message: impl Into<String>) -> Self {
        Self { success: true, data: Some(data), message: Some(message.into()), error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, data: None, message: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntryOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<CodeValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collaborators a session needs.
#[derive(Clone)]
pub struct LabSessionDeps {
    pub factory: Arc<dyn EhrConnectorFactory>,
    pub validator: CodeValidationService,
    pub clock: Arc<dyn Clock>,
}

pub struct LabSession {
    id: String,
    student_id: String,
    instructor_id: Option<String>,
    lab_type: LabType,
    ehr_system: EhrSystem,
    state: LabState,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    actions: Vec<ActionRecord>,
    codes: Vec<CodeRecord>,
    scenario: Option<LabScenario>,
    loaded_patient: Option<PatientRecord>,
    current_patient: Option<Value>,
    current_encounter: Option<Value>,
    backend: Option<Box<dyn EhrConnector>>,
    deps: LabSessionDeps,
    events: EventBus<LabEvent>,
}

impl LabSession {
    /// Create a session in the `Initializing` state. Call
    /// [`LabSession::initialize`] to connect it.
    pub fn new(config: LabSessionConfig, deps: LabSessionDeps) -> Self {
        let started_at = deps.clock.now();
        let id = config.session_id.unwrap_or_else(|| {
            format!("lab_{}_{}", started_at.timestamp_millis(), Uuid::new_v4().simple())
        });

        Self {
            id,
            student_id: config.student_id,
            instructor_id: config.instructor_id,
            lab_type: config.lab_type,
            ehr_system: config.ehr_system,
            state: LabState::Initializing,
            started_at,
            ended_at: None,
            actions: Vec::new(),
            codes: Vec::new(),
            scenario: None,
            loaded_patient: None,
            current_patient: None,
            current_encounter: None,
            backend: None,
            deps,
            events: EventBus::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn instructor_id(&self) -> Option<&str> {
        self.instructor_id.as_deref()
    }

    pub fn lab_type(&self) -> &LabType {
        &self.lab_type
    }

    pub fn ehr_system(&self) -> EhrSystem {
        self.ehr_system
    }

    pub fn state(&self) -> LabState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    pub fn codes(&self) -> &[CodeRecord] {
        &self.codes
    }

    pub fn scenario(&self) -> Option<&LabScenario> {
        self.scenario.as_ref()
    }

    /// Patient loaded by the scenario.
    pub fn loaded_patient(&self) -> Option<&PatientRecord> {
        self.loaded_patient.as_ref()
    }

    /// Patient currently selected, either from the scenario or the last lookup.
    pub fn current_patient(&self) -> Option<&Value> {
        self.current_patient.as_ref()
    }

    pub fn current_encounter(&self) -> Option<&Value> {
        self.current_encounter.as_ref()
    }

    pub fn events(&self) -> &EventBus<LabEvent> {
        &self.events
    }

    /// Metrics for the log so far, evaluated at the end time or now.
    pub fn performance(&self) -> PerformanceSummary {
        let until = self.ended_at.unwrap_or_else(|| self.deps.clock.now());
        performance::summarize(&self.actions, &self.codes, self.started_at, until)
    }

    /// Connect the EHR backend, load the scenario and become `Active`.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the session is `Initializing`. Any
    /// backend failure moves the session to `Error` and is returned.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != LabState::Initializing {
            return Err(self.invalid_transition("initialize"));
        }

        self.events.emit(&LabEvent::SessionInitializing { session_id: self.id.clone() });

        match self.connect_and_load().await {
            Ok(()) => {
                self.state = LabState::Active;
                info!(
                    session_id = %self.id,
                    lab_type = %self.lab_type,
                    ehr_system = %self.ehr_system,
                    "lab session started"
                );
                self.events.emit(&LabEvent::SessionStarted {
                    session_id: self.id.clone(),
                    ehr_system: self.ehr_system,
                    lab_type: self.lab_type.clone(),
                });
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn connect_and_load(&mut self) -> Result<()> {
        let mut backend = self.deps.factory.create(self.ehr_system)?;
        backend.authenticate().await?;
        self.events.emit(&LabEvent::EhrConnected {
            session_id: self.id.clone(),
            system: self.ehr_system,
        });

        let scenario = scenario_for(&self.lab_type);
        let patient = backend.load_patient(&scenario.patient).await?;
        let encounter = match &scenario.encounter {
            Some(encounter) => Some(backend.create_encounter(encounter).await?),
            None => None,
        };

        let patient_id = patient.id.clone();
        let encounter_id =
            encounter.as_ref().and_then(|e| e.get("id")).and_then(Value::as_str).map(String::from);

        self.current_patient = Some(serde_json::to_value(&patient)?);
        self.loaded_patient = Some(patient);
        self.current_encounter = encounter;
        self.scenario = Some(scenario);
        self.backend = Some(backend);

        self.events.emit(&LabEvent::ScenarioLoaded {
            session_id: self.id.clone(),
            patient: Some(patient_id),
            encounter: encounter_id,
        });
        Ok(())
    }

    /// Search the backend for a patient. The action is logged whatever the
    /// outcome; a found patient becomes the current patient.
    pub async fn lookup_patient(&mut self, criteria: &PatientCriteria) -> ActionOutcome {
        let details = serde_json::to_value(criteria).unwrap_or(Value::Null);

        let started = Instant::now();
        let result = match self.require_backend() {
            Ok(backend) => backend.search_patient(criteria).await,
            Err(err) => Err(err),
        };
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(Some(patient)) => {
                self.current_patient = Some(patient.clone());
                ActionOutcome::ok(patient, "Patient found successfully")
            }
            Ok(None) => ActionOutcome::failed("No patient matched the search criteria"),
            Err(err) => ActionOutcome::failed(err.to_string()),
        };

        self.record_action(ActionKind::PatientLookup, details, elapsed, outcome.success);
        outcome
    }

    /// Fetch clinical data of `data_type` for the current patient.
    pub async fn access_clinical_data(&mut self, data_type: &str) -> ActionOutcome {
        let patient_id = self
            .current_patient
            .as_ref()
            .and_then(|patient| patient.get("id"))
            .and_then(Value::as_str)
            .map(String::from);
        let details = json!({ "dataType": data_type, "patientId": patient_id });

        let started = Instant::now();
        let result = match (patient_id.as_deref(), self.require_backend()) {
            (Some(id), Ok(backend)) => backend.get_clinical_data(id, data_type).await,
            (None, Ok(_)) => Err(MedCodeError::InvalidState("no patient selected".into())),
            (_, Err(err)) => Err(err),
        };
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(data) => ActionOutcome::ok(data, format!("{data_type} data retrieved")),
            Err(err) => ActionOutcome::failed(err.to_string()),
        };

        self.record_action(ActionKind::ClinicalDataAccess, details, elapsed, outcome.success);
        outcome
    }

    /// Validate and record a submitted code.
    pub async fn enter_code(&mut self, entry: CodeEntry) -> CodeEntryOutcome {
        if self.state != LabState::Active {
            let err = self.invalid_transition("enter_code");
            warn!(session_id = %self.id, error = %err, "code entry rejected");
            return CodeEntryOutcome {
                success: false,
                validation: None,
                error: Some(err.to_string()),
            };
        }

        let started = Instant::now();
        let validation = self.deps.validator.validate(&entry).await;
        let record = CodeRecord {
            timestamp: self.deps.clock.now(),
            code: entry.code,
            system: entry.system,
            context: entry.context,
            time_to_enter: elapsed_ms(started.elapsed()),
            validation: validation.clone(),
        };

        debug!(
            session_id = %self.id,
            code_system = %record.system,
            valid = record.validation.valid,
            "code entered"
        );
        self.codes.push(record.clone());
        self.events.emit(&LabEvent::CodeEntered { session_id: self.id.clone(), record });

        CodeEntryOutcome { success: true, validation: Some(validation), error: None }
    }

    /// # Errors
    /// Returns `InvalidState` unless the session is `Active`; the state is
    /// left unchanged.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != LabState::Active {
            return Err(self.invalid_transition("pause"));
        }
        self.state = LabState::Paused;
        self.events.emit(&LabEvent::SessionPaused { session_id: self.id.clone() });
        Ok(())
    }

    /// # Errors
    /// Returns `InvalidState` unless the session is `Paused`; the state is
    /// left unchanged.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != LabState::Paused {
            return Err(self.invalid_transition("resume"));
        }
        self.state = LabState::Active;
        self.events.emit(&LabEvent::SessionResumed { session_id: self.id.clone() });
        Ok(())
    }

    /// Finish the session, publish its report and disconnect the backend.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the session is `Active` or `Paused`. A
    /// failed disconnect is logged; the session stays `Completed`.
    pub async fn complete_session(&mut self) -> Result<SessionReport> {
        if !matches!(self.state, LabState::Active | LabState::Paused) {
            return Err(self.invalid_transition("complete_session"));
        }

        let ended_at = self.deps.clock.now();
        self.ended_at = Some(ended_at);
        self.state = LabState::Completed;

        let summary = performance::summarize(&self.actions, &self.codes, self.started_at, ended_at);
        let report = SessionReport {
            session_id: self.id.clone(),
            student_id: self.student_id.clone(),
            lab_type: self.lab_type.clone(),
            ehr_system: self.ehr_system,
            duration: summary.session_duration,
            actions_count: self.actions.len(),
            codes_entered: self.codes.len(),
            accuracy_score: summary.coding_accuracy,
            efficiency_score: summary.efficiency_score,
            performance: summary,
            completed_at: ended_at,
        };

        info!(
            session_id = %self.id,
            codes_entered = report.codes_entered,
            accuracy = report.accuracy_score,
            "lab session completed"
        );
        self.events.emit(&LabEvent::SessionCompleted(report.clone()));

        if let Some(mut backend) = self.backend.take() {
            if let Err(err) = backend.disconnect().await {
                warn!(
                    session_id = %self.id,
                    error = %err,
                    "EHR disconnect failed after completion"
                );
            }
        }

        Ok(report)
    }

    fn require_backend(&mut self) -> Result<&mut Box<dyn EhrConnector>> {
        if self.state != LabState::Active {
            return Err(MedCodeError::InvalidState(format!(
                "session {} is {}, not active",
                self.id, self.state
            )));
        }
        self.backend
            .as_mut()
            .ok_or_else(|| MedCodeError::InvalidState("EHR backend is not connected".into()))
    }

    fn record_action(
        &mut self,
        kind: ActionKind,
        details: Value,
        elapsed: std::time::Duration,
        success: bool,
    ) {
        let record = ActionRecord {
            timestamp: self.deps.clock.now(),
            action: kind,
            details,
            response_time: elapsed_ms(elapsed),
            success,
        };
        self.actions.push(record.clone());
        self.events.emit(&LabEvent::UserAction { session_id: self.id.clone(), action: record });
    }

    fn fail(&mut self, err: &MedCodeError) {
        warn!(session_id = %self.id, error = %err, "lab session failed");
        self.state = LabState::Error;
        self.events
            .emit(&LabEvent::SessionError { session_id: self.id.clone(), error: err.to_string() });
    }

    fn invalid_transition(&self, operation: &str) -> MedCodeError {
        MedCodeError::InvalidState(format!(
            "cannot {operation} session {} while {}",
            self.id, self.state
        ))
    }
}

fn elapsed_ms(elapsed: std::time::Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use parking_lot::Mutex;
    use medcode_domain::CodeSystem;

    use super::*;
    use crate::lab::scenario::{EncounterData, ScenarioPatient};
    use crate::lab::simulator::SimulatorFactory;
    use crate::time::MockClock;

    fn deps(clock: &MockClock) -> LabSessionDeps {
        let clock: Arc<dyn Clock> = Arc::new(clock.clone());
        LabSessionDeps {
            factory: Arc::new(SimulatorFactory::new(Arc::clone(&clock))),
            validator: CodeValidationService::internal_only(),
            clock,
        }
    }

    fn recorded_names(session: &LabSession) -> Arc<Mutex<Vec<&'static str>>> {
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        session.events().subscribe_all(move |event| sink.lock().push(event.name()));
        names
    }

    #[tokio::test]
    async fn initialize_reaches_active_and_emits_lifecycle_events() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "inpatient_coding"), deps(&clock));
        let names = recorded_names(&session);

        session.initialize().await.expect("initialize");

        assert_eq!(session.state(), LabState::Active);
        assert_eq!(session.loaded_patient().map(|p| p.name.as_str()), Some("Jane Smith"));
        assert!(session.current_encounter().is_some());
        assert_eq!(
            *names.lock(),
            vec!["session_initializing", "ehr_connected", "scenario_loaded", "session_started"]
        );
    }

    #[tokio::test]
    async fn pause_before_initialize_is_rejected() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "ehr_navigation"), deps(&clock));

        let err = session.pause().expect_err("pause must be rejected");
        assert!(matches!(err, MedCodeError::InvalidState(_)));
        assert_eq!(session.state(), LabState::Initializing);
    }

    #[tokio::test]
    async fn pause_and_resume_round_trip() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "ehr_navigation"), deps(&clock));
        session.initialize().await.expect("initialize");

        assert!(session.resume().is_err());
        session.pause().expect("pause");
        assert_eq!(session.state(), LabState::Paused);
        assert!(session.pause().is_err());
        session.resume().expect("resume");
        assert_eq!(session.state(), LabState::Active);
    }

    #[tokio::test]
    async fn accuracy_reflects_valid_share_of_entered_codes() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "inpatient_coding"), deps(&clock));
        session.initialize().await.expect("initialize");

        for (code, system) in [
            ("I21.9", CodeSystem::Icd10),
            ("99213", CodeSystem::Cpt),
            ("SCHI-12345", CodeSystem::Schi),
            ("AA00", CodeSystem::Icd10),
        ] {
            let outcome = session.enter_code(CodeEntry::new(code, system)).await;
            assert!(outcome.success);
        }

        clock.advance(Duration::minutes(2));
        let report = session.complete_session().await.expect("report");
        assert_eq!(report.accuracy_score, 0.75);
        assert_eq!(report.codes_entered, 4);
        assert_eq!(report.duration, 120_000);
        assert_eq!(session.state(), LabState::Completed);
    }

    #[tokio::test]
    async fn lookups_are_logged_even_when_nothing_matches() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "ehr_navigation"), deps(&clock));
        session.initialize().await.expect("initialize");

        let miss = session.lookup_patient(&PatientCriteria::by_name("Nobody")).await;
        assert!(!miss.success);

        let hit = session.lookup_patient(&PatientCriteria::by_mrn("MRN123456")).await;
        assert!(hit.success);
        assert_eq!(hit.data.expect("patient")["id"], "PT001");

        let data = session.access_clinical_data("observations").await;
        assert!(data.success);
        assert_eq!(session.actions().len(), 3);
        assert!(!session.actions()[0].success);
    }

    #[tokio::test]
    async fn actions_while_paused_fail_but_are_logged() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "ehr_navigation"), deps(&clock));
        session.initialize().await.expect("initialize");
        session.pause().expect("pause");

        let outcome = session.access_clinical_data("conditions").await;
        assert!(!outcome.success);
        assert_eq!(session.actions().len(), 1);

        let code = session.enter_code(CodeEntry::new("A00", CodeSystem::Icd10)).await;
        assert!(!code.success);
        assert!(session.codes().is_empty());
    }

    #[tokio::test]
    async fn complete_is_rejected_twice() {
        let clock = MockClock::new();
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "ehr_navigation"), deps(&clock));
        session.initialize().await.expect("initialize");
        session.complete_session().await.expect("first completion");
        assert!(session.complete_session().await.is_err());
        assert!(session.pause().is_err());
    }

    #[tokio::test]
    async fn unavailable_backend_moves_session_to_error() {
        let clock = MockClock::new();
        let config = LabSessionConfig::new("student-1", "ehr_navigation")
            .with_ehr_system(EhrSystem::OracleHealth);
        let mut session = LabSession::new(config, deps(&clock));
        let names = recorded_names(&session);

        assert!(session.initialize().await.is_err());
        assert_eq!(session.state(), LabState::Error);
        assert_eq!(*names.lock(), vec!["session_initializing", "session_error"]);
        assert!(session.initialize().await.is_err());
    }

    struct StickyBackend;

    #[async_trait]
    impl EhrConnector for StickyBackend {
        fn system(&self) -> EhrSystem {
            EhrSystem::InternalSimulator
        }

        async fn authenticate(&mut self) -> Result<()> {
            Ok(())
        }

        async fn search_patient(&mut self, _criteria: &PatientCriteria) -> Result<Option<Value>> {
            Ok(None)
        }

        async fn load_patient(&mut self, patient: &ScenarioPatient) -> Result<PatientRecord> {
            Ok(PatientRecord {
                id: patient.id.clone(),
                name: patient.name.clone(),
                dob: patient.dob.clone(),
                mrn: patient.mrn.clone(),
                system: EhrSystem::InternalSimulator,
            })
        }

        async fn get_clinical_data(&mut self, _id: &str, _data_type: &str) -> Result<Value> {
            Ok(json!([]))
        }

        async fn create_encounter(&mut self, _encounter: &EncounterData) -> Result<Value> {
            Ok(json!({ "id": "ENC-X" }))
        }

        async fn disconnect(&mut self) -> Result<()> {
            Err(MedCodeError::Network("socket closed".into()))
        }
    }

    struct StickyFactory;

    impl EhrConnectorFactory for StickyFactory {
        fn create(&self, _system: EhrSystem) -> Result<Box<dyn EhrConnector>> {
            Ok(Box::new(StickyBackend))
        }
    }

    #[tokio::test]
    async fn failed_disconnect_keeps_session_completed() {
        let clock = MockClock::new();
        let mut deps = deps(&clock);
        deps.factory = Arc::new(StickyFactory);
        let mut session =
            LabSession::new(LabSessionConfig::new("student-1", "inpatient_coding"), deps);
        let names = recorded_names(&session);
        session.initialize().await.expect("initialize");

        let report = session.complete_session().await.expect("report despite disconnect");
        assert_eq!(report.session_id, session.id());
        assert_eq!(session.state(), LabState::Completed);
        assert_eq!(names.lock().last(), Some(&"session_completed"));
        assert!(!names.lock().contains(&"session_error"));
        assert!(session.complete_session().await.is_err());
    }
}
