//! Shared helpers for connector integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use medcode_core::{Event, EventBus, MockClock};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a token endpoint answering every call with `token`.
pub async fn mount_token(server: &MockServer, token_path: &str, token: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(token_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": expires_in,
        })))
        .mount(server)
        .await;
}

pub fn mock_clock() -> (MockClock, Arc<MockClock>) {
    let clock = MockClock::new();
    (clock.clone(), Arc::new(clock))
}

/// Names of every event emitted on `bus`, in order.
pub fn record_event_names<E: Event + 'static>(bus: &EventBus<E>) -> Arc<Mutex<Vec<String>>> {
    let names = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&names);
    bus.subscribe_all(move |event: &E| sink.lock().push(event.name().to_string()));
    names
}

/// Number of requests the server received on `request_path`.
pub async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
