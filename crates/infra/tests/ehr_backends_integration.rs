//! Remote EHR backends against mock sandboxes.

#[path = "support.rs"]
mod support;

use medcode_core::lab::{scenario_for, EncounterData};
use medcode_core::{EhrConnector, EhrConnectorFactory, PatientCriteria};
use medcode_domain::config::{EhrBackendConfig, EhrConfig};
use medcode_domain::{EhrSystem, LabType, MedCodeError};
use medcode_infra::ehr::{EpicSandboxEhr, MeditechExpanseEhr, OracleHealthEhr};
use medcode_infra::EhrRegistry;
use serde_json::json;
use support::{mock_clock, mount_token, request_count};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_config(server: &MockServer) -> EhrBackendConfig {
    let mut config = EhrBackendConfig::new(server.uri(), 5_000);
    config.client_id = "lab-client".into();
    config.client_secret = "lab-secret".into();
    config
}

#[tokio::test]
async fn meditech_uses_json_credentials_and_rest_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_partial_json(json!({
            "client_id": "lab-client",
            "scope": "patient.read encounter.write",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mt-token",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/patients/search"))
        .and(header("authorization", "Bearer mt-token"))
        .and(body_json(json!({ "mrn": "MRN789012" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "PT002", "name": "Jane Smith" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/patients/PT002/observations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "code": "8480-6" }])))
        .mount(&server)
        .await;

    let (_, clock) = mock_clock();
    let mut ehr = MeditechExpanseEhr::new(&backend_config(&server), clock, Default::default())
        .expect("backend");
    ehr.authenticate().await.expect("authenticated");

    let patient = ehr
        .search_patient(&PatientCriteria::by_mrn("MRN789012"))
        .await
        .expect("search")
        .expect("match");
    assert_eq!(patient["name"], "Jane Smith");

    let data = ehr.get_clinical_data("PT002", "observations").await.expect("data");
    assert_eq!(data[0]["code"], "8480-6");

    let record = ehr.load_patient(&scenario_for(&LabType::InpatientCoding).patient).await;
    assert_eq!(record.expect("record").system, EhrSystem::MeditechExpanse);
}

#[tokio::test]
async fn epic_searches_and_creates_fhir_resources() {
    let server = MockServer::start().await;
    mount_token(&server, "/oauth2/token", "epic-token", 3600).await;
    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("name", "Jane Smith"))
        .and(query_param("birthdate", "1968-07-22"))
        .and(header("accept", "application/fhir+json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            json!({
                "resourceType": "Bundle",
                "entry": [{ "resource": { "resourceType": "Patient", "id": "epic-7" } }],
            })
            .to_string(),
            "application/fhir+json",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/MedicationRequest"))
        .and(query_param("patient", "epic-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 0 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Encounter"))
        .and(header("content-type", "application/fhir+json"))
        .and(body_partial_json(json!({
            "resourceType": "Encounter",
            "status": "finished",
            "class": { "code": "IMP" },
            "period": { "start": "2024-01-15", "end": "2024-01-18" },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "enc-epic-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let (_, clock) = mock_clock();
    let mut ehr =
        EpicSandboxEhr::new(&backend_config(&server), clock, Default::default()).expect("backend");

    let criteria = PatientCriteria {
        name: Some("Jane Smith".into()),
        birthdate: Some("1968-07-22".into()),
        mrn: None,
    };
    let patient = ehr.search_patient(&criteria).await.expect("search").expect("match");
    assert_eq!(patient["id"], "epic-7");

    ehr.get_clinical_data("epic-7", "medications").await.expect("medications");

    let encounter = EncounterData {
        encounter_type: "inpatient".into(),
        admission_date: Some("2024-01-15".into()),
        discharge_date: Some("2024-01-18".into()),
        ..Default::default()
    };
    let created = ehr.create_encounter(&encounter).await.expect("encounter");
    assert_eq!(created["id"], "enc-epic-1");
    assert_eq!(request_count(&server, "/oauth2/token").await, 1);
}

#[tokio::test]
async fn epic_empty_bundle_means_no_match() {
    let server = MockServer::start().await;
    mount_token(&server, "/oauth2/token", "epic-token", 3600).await;
    Mock::given(method("GET"))
        .and(path("/Patient"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "resourceType": "Bundle" })),
        )
        .mount(&server)
        .await;

    let (_, clock) = mock_clock();
    let mut ehr =
        EpicSandboxEhr::new(&backend_config(&server), clock, Default::default()).expect("backend");
    let found = ehr.search_patient(&PatientCriteria::by_name("Nobody")).await.expect("search");
    assert!(found.is_none());
}

#[tokio::test]
async fn oracle_sends_api_key_without_token_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/encounters"))
        .and(header("x-api-key", "oracle-key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "enc-or-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = backend_config(&server);
    config.api_key = Some("oracle-key".into());
    let mut ehr = OracleHealthEhr::new(&config, Default::default()).expect("backend");
    ehr.authenticate().await.expect("key present");

    let encounter = EncounterData { encounter_type: "outpatient".into(), ..Default::default() };
    let created = ehr.create_encounter(&encounter).await.expect("encounter");
    assert_eq!(created["id"], "enc-or-1");

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.iter().all(|request| request.headers.get("authorization").is_none()));
}

#[tokio::test]
async fn registry_backends_report_failures_on_shared_bus() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let ehr_config = EhrConfig { meditech: backend_config(&server), ..EhrConfig::default() };
    let (_, clock) = mock_clock();
    let registry = EhrRegistry::new(ehr_config, clock);
    let names = support::record_event_names(registry.events());

    let mut backend = registry.create(EhrSystem::MeditechExpanse).expect("backend");
    let err = backend.authenticate().await.expect_err("rejected");

    assert!(matches!(err, MedCodeError::Auth(_)));
    assert_eq!(*names.lock(), vec!["auth_error"]);
}
