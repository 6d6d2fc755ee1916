//! Authenticated request execution
//!
//! Every domain call goes through [`RequestExecutor::request`]: it makes sure
//! a token is live, merges the platform headers with caller overrides,
//! resolves the endpoint against the base URL and sends the call through the
//! retrying [`HttpClient`].

use std::sync::Arc;
use std::time::Duration;

use medcode_core::EventBus;
use medcode_domain::Result;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::auth::AccessTokenProvider;
use super::events::ConnectorEvent;
use crate::errors::ConnectorError;
use crate::http::{HttpClient, RetryOn, USER_AGENT};

/// Configuration for a [`RequestExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Platform label used in events and logs.
    pub platform: String,
    /// Base URL relative endpoints are resolved against.
    pub base_url: String,
    pub timeout: Duration,
    /// Total attempts per request, including the first.
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub retry_on: RetryOn,
    /// Headers sent with every request, e.g. content type or API key.
    pub headers: Vec<(String, String)>,
}

impl ExecutorConfig {
    pub fn new(platform: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            base_backoff: Duration::from_secs(2),
            retry_on: RetryOn::default(),
            headers: Vec::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Per-call options. Headers given here override the platform defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Sent as `Accept-Language`.
    pub locale: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(body: Value) -> Self {
        Self { body: Some(body), ..Self::default() }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// JSON as-is; text is wrapped in a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

pub struct RequestExecutor {
    config: ExecutorConfig,
    http: HttpClient,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    events: EventBus<ConnectorEvent>,
}

impl RequestExecutor {
    /// Executor that attaches a bearer token from `auth` to every call.
    ///
    /// # Errors
    /// Returns `Config` if the base URL is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(
        config: ExecutorConfig,
        auth: Arc<dyn AccessTokenProvider>,
        events: EventBus<ConnectorEvent>,
    ) -> std::result::Result<Self, ConnectorError> {
        Self::build(config, Some(auth), events)
    }

    /// Executor for platforms authenticated by a static header only.
    ///
    /// # Errors
    /// Same as [`RequestExecutor::new`].
    pub fn unauthenticated(
        config: ExecutorConfig,
        events: EventBus<ConnectorEvent>,
    ) -> std::result::Result<Self, ConnectorError> {
        Self::build(config, None, events)
    }

    fn build(
        config: ExecutorConfig,
        auth: Option<Arc<dyn AccessTokenProvider>>,
        events: EventBus<ConnectorEvent>,
    ) -> std::result::Result<Self, ConnectorError> {
        if !is_absolute_http(&config.base_url) {
            return Err(ConnectorError::Config(format!(
                "{}: invalid base URL {:?}",
                config.platform, config.base_url
            )));
        }
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.max_attempts)
            .base_backoff(config.base_backoff)
            .retry_on(config.retry_on)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { config, http, auth, events })
    }

    pub fn platform(&self) -> &str {
        &self.config.platform
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Absolute endpoints are used as-is; anything else is appended to the
    /// base URL.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if is_absolute_http(endpoint) {
            return endpoint.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        if endpoint.starts_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        }
    }

    /// Send one call.
    ///
    /// # Errors
    /// `Auth` when no token can be obtained. After the last attempt, a
    /// transport failure or non-2xx answer is returned and `api_error` is
    /// emitted with the attempt count.
    #[instrument(skip(self, options), fields(platform = %self.config.platform))]
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> std::result::Result<ResponseBody, ConnectorError> {
        let token = match &self.auth {
            Some(auth) => Some(auth.access_token().await?),
            None => None,
        };

        let headers = self.merge_headers(token.as_deref(), &options)?;
        let url = self.resolve_url(endpoint);
        debug!(%method, %url, "dispatching request");

        let mut builder = self.http.request(method, url.as_str()).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let delivery = self.http.send_counted(builder).await;
        let attempts = delivery.attempts;
        let outcome = match delivery.result {
            Ok(response) => read_response(response).await,
            Err(err) => Err(err),
        };

        outcome.inspect_err(|err| {
            warn!(endpoint, attempts, error = %err, "request failed");
            self.events.emit(&ConnectorEvent::ApiError {
                platform: self.config.platform.clone(),
                endpoint: endpoint.to_string(),
                error: err.to_string(),
                attempts,
            });
        })
    }

    /// Send a call and return the body as JSON.
    pub async fn send_json(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        Ok(self.request(method, endpoint, options).await?.into_json())
    }

    pub async fn get_json(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        self.send_json(Method::GET, endpoint, options).await
    }

    pub async fn post_json<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<Value> {
        let options = RequestOptions::json(serde_json::to_value(body)?);
        self.send_json(Method::POST, endpoint, options).await
    }

    pub async fn patch_json<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<Value> {
        let options = RequestOptions::json(serde_json::to_value(body)?);
        self.send_json(Method::PATCH, endpoint, options).await
    }

    fn merge_headers(
        &self,
        token: Option<&str>,
        options: &RequestOptions,
    ) -> std::result::Result<HeaderMap, ConnectorError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.headers {
            headers.insert(header_name(name)?, header_value(value)?);
        }
        if let Some(token) = token {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        if let Some(locale) = &options.locale {
            headers.insert(ACCEPT_LANGUAGE, header_value(locale)?);
        }
        for (name, value) in &options.headers {
            headers.insert(header_name(name)?, header_value(value)?);
        }
        if options.body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }
}

fn header_name(name: &str) -> std::result::Result<HeaderName, ConnectorError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| ConnectorError::InvalidInput(format!("invalid header name {name}: {err}")))
}

fn header_value(value: &str) -> std::result::Result<HeaderValue, ConnectorError> {
    HeaderValue::from_str(value)
        .map_err(|err| ConnectorError::InvalidInput(format!("invalid header value: {err}")))
}

/// `prefix` followed by each of `segments`, percent-encoded so that a `/`
/// or a space inside a value stays within its own path segment.
pub fn endpoint_path<S: AsRef<str>>(
    prefix: &str,
    segments: &[S],
) -> std::result::Result<String, ConnectorError> {
    let mut url = Url::parse("http://localhost/")
        .map_err(|err| ConnectorError::Config(format!("path builder: {err}")))?;
    url.set_path(prefix);
    url.path_segments_mut()
        .map_err(|()| ConnectorError::Config(format!("{prefix} cannot take segments")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().to_string())
}

fn is_absolute_http(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

async fn read_response(
    response: reqwest::Response,
) -> std::result::Result<ResponseBody, ConnectorError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("json"));

    let text = response.text().await?;
    if !status.is_success() {
        return Err(ConnectorError::upstream(status.as_u16(), text));
    }

    if is_json {
        if text.trim().is_empty() {
            return Ok(ResponseBody::Json(Value::Null));
        }
        return Ok(ResponseBody::Json(serde_json::from_str(&text)?));
    }
    Ok(ResponseBody::Text(text))
}
