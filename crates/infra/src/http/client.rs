use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::ConnectorError;

/// `User-Agent` sent by every connector.
pub const USER_AGENT: &str = concat!("medcode-connectors/", env!("CARGO_PKG_VERSION"));

/// Which answers are worth another attempt. Transport failures are always
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryOn {
    /// Only 5xx answers.
    #[default]
    ServerErrors,
    /// Every non-success answer, 4xx included.
    AnyFailure,
}

impl RetryOn {
    pub fn retries(self, status: StatusCode) -> bool {
        match self {
            Self::ServerErrors => status.is_server_error(),
            Self::AnyFailure => !status.is_success(),
        }
    }
}

/// Outcome of [`HttpClient::send_counted`]: the final result plus the number
/// of attempts made to get it.
#[derive(Debug)]
pub struct Delivery {
    pub attempts: usize,
    pub result: Result<Response, ConnectorError>,
}

/// HTTP client with built-in retry and timeout support.
///
/// Connection failures, timeouts and the answers selected by [`RetryOn`] are
/// retried until `max_attempts` is reached. The wait before retry *k* is
/// `base_backoff * 2^(k-1)`, so the default base of two seconds gives
/// 2, 4, 8, ... seconds.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
    retry_on: RetryOn,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// A failed answer on the last attempt is returned as `Ok`; status
    /// handling is left to the caller.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ConnectorError> {
        self.send_counted(builder).await.result
    }

    /// Like [`HttpClient::send`], also reporting how many attempts were made.
    pub async fn send_counted(&self, builder: RequestBuilder) -> Delivery {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let is_last = attempt + 1 >= attempts;
            let Some(cloned_builder) = builder.try_clone() else {
                return Delivery {
                    attempts: attempt,
                    result: Err(ConnectorError::Config(
                        "request body cannot be cloned; buffer the body to enable retries".into(),
                    )),
                };
            };

            let request = match cloned_builder.build() {
                Ok(request) => request,
                Err(err) => return Delivery { attempts: attempt, result: Err(err.into()) },
            };

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if self.retry_on.retries(status) && !is_last {
                        warn!(
                            attempt = attempt + 1,
                            %method,
                            %url,
                            %status,
                            "unsuccessful response; retrying"
                        );
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Delivery { attempts: attempt + 1, result: Ok(response) };
                }
                Err(err) => {
                    debug!(
                        attempt = attempt + 1,
                        %method,
                        %url,
                        error = %err,
                        "HTTP request failed"
                    );

                    if !is_last && should_retry_error(&err) {
                        warn!(
                            attempt = attempt + 1,
                            %method,
                            %url,
                            error = %err,
                            "transport failure; retrying"
                        );
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Delivery { attempts: attempt + 1, result: Err(err.into()) };
                }
            }
        }

        Delivery {
            attempts,
            result: Err(ConnectorError::Transport(
                "http client exhausted retries without producing a result".into(),
            )),
        }
    }

    /// Waits applied between attempts for a request that fails every time.
    pub fn retry_schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|retry| self.backoff_delay(retry)).collect()
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    retry_on: RetryOn,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            base_backoff: Duration::from_secs(2),
            retry_on: RetryOn::default(),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
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

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, ConnectorError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| ConnectorError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
            retry_on: self.retry_on,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_request() {
        return true;
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return true;
        }
    }
    false
}
