//! Client-credentials token management
//!
//! Obtains a bearer token from a platform token endpoint, caches it together
//! with its expiry, and refreshes it shortly before it lapses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use medcode_core::{Clock, EventBus};
use medcode_domain::constants::TOKEN_REFRESH_MARGIN_SECS;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::events::ConnectorEvent;
use crate::errors::ConnectorError;
use crate::http::{HttpClient, USER_AGENT};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Trait for providing access tokens
///
/// Lets request executors and EHR backends share one token source and makes
/// them testable with a fixed token.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token, refreshing it if needed.
    async fn access_token(&self) -> Result<String, ConnectorError>;
}

/// How client credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Basic base64(id:secret)` with a form-encoded grant.
    Basic,
    /// `client_id` and `client_secret` as form fields.
    FormCredentials,
    /// `client_id` and `client_secret` in a JSON body.
    JsonCredentials,
}

#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Platform label used in events and logs.
    pub platform: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
    pub scheme: AuthScheme,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    fn live_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let expires_at = self.expires_at?;
        let margin = chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if expires_at - margin > now {
            self.access_token.as_deref()
        } else {
            None
        }
    }
}

/// Caches one bearer token per connector.
///
/// Token state sits behind an async mutex that is held across the token
/// call, so concurrent callers share a single refresh.
pub struct CredentialManager {
    config: CredentialConfig,
    http: HttpClient,
    clock: Arc<dyn Clock>,
    events: EventBus<ConnectorEvent>,
    state: Mutex<TokenState>,
}

impl CredentialManager {
    /// # Errors
    /// Returns `Config` if the underlying HTTP client cannot be built.
    pub fn new(
        config: CredentialConfig,
        clock: Arc<dyn Clock>,
        events: EventBus<ConnectorEvent>,
    ) -> Result<Self, ConnectorError> {
        // Token calls are never retried.
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(1)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { config, http, clock, events, state: Mutex::new(TokenState::default()) })
    }

    pub fn platform(&self) -> &str {
        &self.config.platform
    }

    /// Run the client-credentials grant and store the new token.
    ///
    /// # Errors
    /// `Auth` on a non-2xx answer, an unreachable endpoint or an unreadable
    /// token body. `auth_error` is emitted in every case.
    pub async fn authenticate(&self) -> Result<String, ConnectorError> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await
    }

    /// Return the cached token, or authenticate when there is none or it
    /// expires within the refresh margin.
    pub async fn ensure_authenticated(&self) -> Result<String, ConnectorError> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.live_token(self.clock.now()) {
            return Ok(token.to_string());
        }
        debug!(platform = %self.config.platform, "token missing or near expiry; refreshing");
        self.refresh(&mut state).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.live_token(self.clock.now()).is_some()
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.expires_at
    }

    /// Drop the cached token; the next request authenticates again.
    pub async fn invalidate(&self) {
        *self.state.lock().await = TokenState::default();
    }

    async fn refresh(&self, state: &mut TokenState) -> Result<String, ConnectorError> {
        match self.request_token().await {
            Ok(token) => {
                let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
                let ttl = u32::try_from(expires_in).unwrap_or(u32::MAX);
                let expires_at = self.clock.now() + chrono::Duration::seconds(i64::from(ttl));
                state.access_token = Some(token.access_token.clone());
                state.expires_at = Some(expires_at);

                info!(platform = %self.config.platform, expires_in, "authenticated");
                self.events.emit(&ConnectorEvent::Authenticated {
                    platform: self.config.platform.clone(),
                    token_type: token.token_type,
                    expires_in,
                });
                Ok(token.access_token)
            }
            Err(err) => {
                *state = TokenState::default();
                warn!(platform = %self.config.platform, error = %err, "authentication failed");
                self.events.emit(&ConnectorEvent::AuthError {
                    platform: self.config.platform.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn request_token(&self) -> Result<TokenResponse, ConnectorError> {
        let config = &self.config;
        let builder = self
            .http
            .request(Method::POST, config.token_url.as_str())
            .header(ACCEPT, "application/json");

        let builder = match config.scheme {
            AuthScheme::Basic => {
                let encoded =
                    BASE64.encode(format!("{}:{}", config.client_id, config.client_secret));
                let mut form = vec![("grant_type", "client_credentials")];
                if let Some(scope) = &config.scope {
                    form.push(("scope", scope.as_str()));
                }
                builder.header(AUTHORIZATION, format!("Basic {encoded}")).form(&form)
            }
            AuthScheme::FormCredentials => {
                let mut form = vec![
                    ("grant_type", "client_credentials"),
                    ("client_id", config.client_id.as_str()),
                    ("client_secret", config.client_secret.as_str()),
                ];
                if let Some(scope) = &config.scope {
                    form.push(("scope", scope.as_str()));
                }
                builder.form(&form)
            }
            AuthScheme::JsonCredentials => builder.json(&serde_json::json!({
                "client_id": config.client_id,
                "client_secret": config.client_secret,
                "grant_type": "client_credentials",
                "scope": config.scope,
            })),
        };

        let response = self
            .http
            .send(builder)
            .await
            .map_err(|err| ConnectorError::Auth(format!("token endpoint unreachable: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Auth(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|err| ConnectorError::Auth(format!("invalid token response: {err}")))
    }
}

#[async_trait]
impl AccessTokenProvider for CredentialManager {
    async fn access_token(&self) -> Result<String, ConnectorError> {
        self.ensure_authenticated().await
    }
}

/// Fixed token, for backends configured with a pre-issued credential and for
/// tests.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ConnectorError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use medcode_core::MockClock;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer, scheme: AuthScheme) -> CredentialConfig {
        CredentialConfig {
            platform: "test".into(),
            token_url: format!("{}/auth/token", server.uri()),
            client_id: "id".into(),
            client_secret: "secret".into(),
            scope: Some("read write".into()),
            scheme,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn basic_scheme_sends_encoded_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "token_type": "Bearer",
                "expires_in": 600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let clock = MockClock::new();
        let manager = CredentialManager::new(
            config(&server, AuthScheme::Basic),
            Arc::new(clock.clone()),
            EventBus::new(),
        )
        .expect("manager");

        assert_eq!(manager.authenticate().await.expect("token"), "tok");
        assert_eq!(
            manager.expires_at().await.expect("expiry"),
            clock.now() + chrono::Duration::seconds(600)
        );
    }

    #[tokio::test]
    async fn json_scheme_posts_credentials_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .and(body_string_contains("\"client_secret\":\"secret\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "json-tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let clock = MockClock::new();
        let manager = CredentialManager::new(
            config(&server, AuthScheme::JsonCredentials),
            Arc::new(clock.clone()),
            EventBus::new(),
        )
        .expect("manager");

        manager.authenticate().await.expect("token");
        assert_eq!(
            manager.expires_at().await.expect("expiry"),
            clock.now() + chrono::Duration::seconds(3600)
        );
    }

    #[tokio::test]
    async fn rejected_credentials_clear_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = CredentialManager::new(
            config(&server, AuthScheme::FormCredentials),
            Arc::new(MockClock::new()),
            EventBus::new(),
        )
        .expect("manager");

        let err = manager.authenticate().await.expect_err("should fail");
        assert!(matches!(err, ConnectorError::Auth(msg) if msg.contains("401")));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn static_provider_returns_fixed_token() {
        let provider = StaticTokenProvider::new("test-token");
        assert_eq!(provider.access_token().await.expect("token"), "test-token");
    }
}
