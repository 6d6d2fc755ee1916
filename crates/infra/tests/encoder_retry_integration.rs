//! Retry and error reporting of the encoder connector.

#[path = "support.rs"]
mod support;

use std::time::{Duration, Instant};

use medcode_domain::config::EncoderConfig;
use medcode_domain::CodeEntry;
use medcode_infra::integrations::encoder::{DrgAlternative, DrgInput};
use medcode_infra::{ConnectorEvent, EncoderConnector};
use parking_lot::Mutex;
use serde_json::json;
use support::{mock_clock, mount_token, request_count};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn encoder_config(server: &MockServer, retry_attempts: u32) -> EncoderConfig {
    EncoderConfig {
        sandbox_url: server.uri(),
        client_id: "enc-client".into(),
        client_secret: "enc-secret".into(),
        api_key: "enc-key".into(),
        timeout_ms: 5_000,
        retry_attempts,
        ..EncoderConfig::default()
    }
}

fn connector(server: &MockServer, retry_attempts: u32) -> EncoderConnector {
    let (_, clock) = mock_clock();
    EncoderConnector::with_backoff(
        &encoder_config(server, retry_attempts),
        clock,
        Duration::from_millis(5),
    )
    .expect("connector")
}

#[tokio::test]
async fn persistent_server_error_is_tried_exactly_retry_attempts_times() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let encoder = connector(&server, 3);
    let failures = std::sync::Arc::new(Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&failures);
    encoder.events().subscribe("api_error", move |event| {
        if let ConnectorEvent::ApiError { endpoint, attempts, .. } = event {
            sink.lock().push((endpoint.clone(), *attempts));
        }
    });

    let err = encoder
        .validate_codes(&[CodeEntry::new("I21.9", "ICD10")])
        .await
        .expect_err("server keeps failing");

    assert_eq!(err.upstream_status(), Some(503));
    assert_eq!(request_count(&server, "/encoder/validate").await, 3);
    assert_eq!(request_count(&server, "/auth/token").await, 1);
    assert_eq!(*failures.lock(), vec![("/encoder/validate".to_string(), 3)]);
}

#[tokio::test]
async fn persistent_client_error_is_also_retried() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .respond_with(ResponseTemplate::new(400).set_body_string("malformed"))
        .mount(&server)
        .await;

    let encoder = connector(&server, 3);
    let report = encoder
        .validate_codes(&[CodeEntry::new("??", "ICD10")])
        .await
        .expect("rejection is reported, not raised");

    assert!(!report.outcome.valid);
    assert_eq!(request_count(&server, "/encoder/validate").await, 3);
}

#[tokio::test]
async fn rejected_validation_becomes_invalid_report() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown code system"))
        .mount(&server)
        .await;

    let encoder = connector(&server, 1);
    let report = encoder
        .validate_codes(&[CodeEntry::new("Z99.X", "ICD10")])
        .await
        .expect("report");

    assert!(!report.outcome.valid);
    assert!(report.results.is_empty());
    assert_eq!(report.outcome.errors.len(), 1);
    assert!(report.outcome.errors[0].starts_with("Code validation failed"));
    assert!(report.outcome.errors[0].contains("unknown code system"));
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .and(header("authorization", "Bearer enc-token"))
        .and(header("x-3m-api-key", "enc-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "code": "I21.9", "valid": true, "saudi_compliant": true }]
        })))
        .mount(&server)
        .await;

    let encoder = connector(&server, 3);
    let report = encoder
        .validate_codes(&[CodeEntry::new("I21.9", "ICD10")])
        .await
        .expect("second attempt succeeds");

    assert!(report.outcome.valid);
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].valid);
    assert_eq!(request_count(&server, "/encoder/validate").await, 2);
}

#[tokio::test]
async fn single_attempt_policy_gives_up_immediately() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let encoder = connector(&server, 1);
    assert!(encoder.validate_codes(&[CodeEntry::new("A00", "ICD10")]).await.is_err());
    assert_eq!(request_count(&server, "/encoder/validate").await, 1);
}

#[tokio::test]
async fn default_backoff_waits_two_then_four_seconds() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("POST"))
        .and(path("/encoder/validate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (_, clock) = mock_clock();
    let encoder = EncoderConnector::new(&encoder_config(&server, 3), clock).expect("connector");
    let started = Instant::now();
    let result = encoder.validate_codes(&[CodeEntry::new("I21.9", "ICD10")]).await;
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert_eq!(request_count(&server, "/encoder/validate").await, 3);
    assert!(elapsed >= Duration::from_secs(6), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "waited {elapsed:?}");
}

fn drg_answer(code: &str, weight: f64, cost: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "drg": { "code": code, "description": format!("Group {code}") },
        "financial": { "relative_weight": weight, "expected_cost_sar": cost },
    }))
}

async fn mount_drg(server: &MockServer, principal: &str, answer: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/drg/calculate"))
        .and(body_partial_json(json!({ "clinical_data": { "principal_diagnosis": principal } })))
        .respond_with(answer)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn drg_comparison_groups_base_and_each_alternative() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    mount_drg(&server, "I21.9", drg_answer("F60B", 1.0, 10_000.0)).await;
    mount_drg(&server, "I21.0", drg_answer("F60A", 1.5, 15_000.0)).await;
    mount_drg(&server, "I25.1", drg_answer("F62B", 0.8, 8_000.0)).await;

    let base = DrgInput {
        age: 61,
        gender: "M".into(),
        admission_date: "2026-03-01".into(),
        principal_diagnosis: "I21.9".into(),
        ..DrgInput::default()
    };
    let alternatives = [
        DrgAlternative {
            scenario_name: "anterior wall".into(),
            principal_diagnosis: Some("I21.0".into()),
            ..DrgAlternative::default()
        },
        DrgAlternative {
            scenario_name: "chronic ischaemia".into(),
            principal_diagnosis: Some("I25.1".into()),
            ..DrgAlternative::default()
        },
    ];

    let encoder = connector(&server, 1);
    let report = encoder.drg().compare_options(&base, &alternatives).await.expect("report");

    assert_eq!(request_count(&server, "/drg/calculate").await, 3);
    assert_eq!(report.base_scenario.drg_assignment.drg_code, "F60B");
    assert_eq!(report.comparisons.len(), 2);

    let upgrade = &report.comparisons[0];
    assert_eq!(upgrade.drg_comparison.alternative_drg, "F60A");
    assert_eq!(upgrade.recommendation.recommendation, "Consider alternative coding");
    assert_eq!(upgrade.recommendation.financial_impact, "+5000.00 SAR");

    let downgrade = &report.comparisons[1];
    assert_eq!(downgrade.drg_comparison.base_drg, "F60B");
    assert_eq!(downgrade.recommendation.recommendation, "Current coding preferred");
    assert_eq!(downgrade.recommendation.financial_impact, "-2000.00 SAR");

    let best = report.best_option.expect("best option");
    assert_eq!(best.scenario, "anterior wall");
}

#[tokio::test]
async fn drg_explanation_escapes_the_code_segment() {
    let server = MockServer::start().await;
    mount_token(&server, "/auth/token", "enc-token", 3600).await;
    Mock::given(method("GET"))
        .and(path("/drg/explain/F60%2FA%20x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Circulatory disorders with AMI",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let encoder = connector(&server, 1);
    let explanation = encoder.drg().explain("F60/A x").await.expect("explanation");

    assert_eq!(explanation.drg_code, "F60/A x");
    assert_eq!(explanation.title, "Circulatory disorders with AMI");
}
