//! Token lifecycle of the credential manager against a mock token endpoint.

#[path = "support.rs"]
mod support;

use std::time::Duration;

use medcode_core::EventBus;
use medcode_infra::connector::{AuthScheme, CredentialConfig, CredentialManager};
use medcode_infra::ConnectorError;
use support::{mock_clock, record_event_names, request_count};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential_config(server: &MockServer) -> CredentialConfig {
    CredentialConfig {
        platform: "test-platform".into(),
        token_url: format!("{}/oauth/token", server.uri()),
        client_id: "client".into(),
        client_secret: "secret".into(),
        scope: Some("coding.read".into()),
        scheme: AuthScheme::FormCredentials,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn token_is_reused_until_inside_refresh_margin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("client_id=client"))
        .and(body_string_contains("scope=coding.read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-1",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    let (clock, shared_clock) = mock_clock();
    let manager =
        CredentialManager::new(credential_config(&server), shared_clock, EventBus::new())
            .expect("manager");

    assert!(!manager.is_authenticated().await);
    assert_eq!(manager.ensure_authenticated().await.expect("token"), "tok-1");
    assert_eq!(request_count(&server, "/oauth/token").await, 1);

    // 3600 s lifetime, 60 s margin: still fresh at +3539 s.
    clock.advance(chrono::Duration::seconds(3539));
    manager.ensure_authenticated().await.expect("cached token");
    assert_eq!(request_count(&server, "/oauth/token").await, 1);

    clock.advance(chrono::Duration::seconds(2));
    manager.ensure_authenticated().await.expect("refreshed token");
    assert_eq!(request_count(&server, "/oauth/token").await, 2);
}

#[tokio::test]
async fn missing_expires_in_defaults_to_one_hour() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "t" })),
        )
        .mount(&server)
        .await;

    let (clock, shared_clock) = mock_clock();
    let start = medcode_core::Clock::now(&clock);
    let manager =
        CredentialManager::new(credential_config(&server), shared_clock, EventBus::new())
            .expect("manager");
    manager.authenticate().await.expect("token");

    let expires_at = manager.expires_at().await.expect("expiry");
    assert_eq!(expires_at - start, chrono::Duration::seconds(3600));
}

#[tokio::test]
async fn rejected_credentials_emit_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;

    let events = EventBus::new();
    let names = record_event_names(&events);
    let (_, shared_clock) = mock_clock();
    let manager =
        CredentialManager::new(credential_config(&server), shared_clock, events).expect("manager");

    let err = manager.ensure_authenticated().await.expect_err("rejected");
    assert!(matches!(err, ConnectorError::Auth(ref msg) if msg.contains("401")));
    assert!(!manager.is_authenticated().await);
    assert_eq!(*names.lock(), vec!["auth_error"]);
}

#[tokio::test]
async fn invalidate_forces_a_new_token_call() {
    let server = MockServer::start().await;
    support::mount_token(&server, "/oauth/token", "tok", 3600).await;

    let events = EventBus::new();
    let names = record_event_names(&events);
    let (_, shared_clock) = mock_clock();
    let manager =
        CredentialManager::new(credential_config(&server), shared_clock, events).expect("manager");

    manager.ensure_authenticated().await.expect("token");
    manager.invalidate().await;
    assert!(!manager.is_authenticated().await);
    manager.ensure_authenticated().await.expect("token again");

    assert_eq!(request_count(&server, "/oauth/token").await, 2);
    assert_eq!(*names.lock(), vec!["authenticated", "authenticated"]);
}
