//! Lab sessions end to end through the EHR registry.

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use medcode_core::lab::{HistoryFilter, LabManager};
use medcode_core::{CodeValidationService, LabSessionConfig, LabSessionDeps};
use medcode_domain::config::{EhrBackendConfig, EhrConfig};
use medcode_domain::{CodeEntry, EhrSystem, LabState, LabType};
use medcode_infra::EhrRegistry;
use serde_json::json;
use support::{mock_clock, mount_token, record_event_names};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager(ehr: EhrConfig) -> LabManager {
    let (_, clock) = mock_clock();
    let registry = EhrRegistry::new(ehr, clock.clone());
    LabManager::new(LabSessionDeps {
        factory: Arc::new(registry),
        validator: CodeValidationService::internal_only(),
        clock,
    })
}

#[tokio::test]
async fn inpatient_lab_on_simulator_produces_report() {
    let manager = manager(EhrConfig::default());
    let names = record_event_names(manager.events());

    let config = LabSessionConfig::new("student-1", "inpatient_coding");
    let session = manager.create_session(config).await.expect("session");
    let session_id = {
        let mut session = session.lock().await;
        assert_eq!(session.state(), LabState::Active);
        assert_eq!(session.loaded_patient().expect("patient").name, "Jane Smith");

        for code in ["I21.9", "E11.9", "AA00", "I25.10"] {
            let outcome = session.enter_code(CodeEntry::new(code, "ICD10")).await;
            assert!(outcome.success);
        }
        session.id().to_string()
    };

    let report = manager.terminate_session(&session_id).await.expect("report");
    assert_eq!(report.lab_type, LabType::InpatientCoding);
    assert_eq!(report.ehr_system, EhrSystem::InternalSimulator);
    assert_eq!(report.codes_entered, 4);
    assert_eq!(report.accuracy_score, 0.75);

    assert_eq!(manager.active_count(), 0);
    let history = manager.session_history(&HistoryFilter {
        student_id: Some("student-1".into()),
        ..HistoryFilter::default()
    });
    assert_eq!(history.len(), 1);
    assert_eq!(*names.lock(), vec!["session_started", "session_completed"]);
}

#[tokio::test]
async fn meditech_lab_creates_the_scenario_encounter() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "mt-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encounters"))
        .and(body_partial_json(json!({ "type": "inpatient", "primary_diagnosis": "I21.9" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "ENC-MT-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let ehr = EhrConfig {
        meditech: EhrBackendConfig::new(server.uri(), 5_000),
        ..EhrConfig::default()
    };
    let manager = manager(ehr);
    let config = LabSessionConfig::new("student-2", "inpatient_coding")
        .with_ehr_system(EhrSystem::MeditechExpanse);

    let session = manager.create_session(config).await.expect("session");
    let session = session.lock().await;
    assert_eq!(session.state(), LabState::Active);
    assert_eq!(session.current_encounter().expect("encounter")["id"], "ENC-MT-1");
    assert_eq!(session.loaded_patient().expect("patient").system, EhrSystem::MeditechExpanse);
}

#[tokio::test]
async fn oracle_lab_without_key_is_not_registered() {
    let manager = manager(EhrConfig::default());
    let names = record_event_names(manager.events());

    let config = LabSessionConfig::new("student-3", "ehr_navigation")
        .with_ehr_system(EhrSystem::OracleHealth);
    assert!(manager.create_session(config).await.is_err());

    assert_eq!(manager.active_count(), 0);
    assert_eq!(*names.lock(), vec!["session_error"]);
}
