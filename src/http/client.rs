//! Retrying HTTP client
//!
//! Every call is described by a `PageRequest`. The client resolves relative
//! paths against its base URL, waits on the rate limiter, attaches the bearer
//! token and classifies each attempt's outcome.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::transport::{PageRequest, PageTransport};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::types::{BackoffType, JsonValue, StringMap};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently a failed request is re-sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub backoff: BackoffType,
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound for any single delay
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffType::Exponential,
            initial: Duration::from_millis(100),
            max: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = match self.backoff {
            BackoffType::Constant => self.initial,
            BackoffType::Linear => self.initial.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => self.initial.saturating_mul(2u32.saturating_pow(attempt)),
        };
        scaled.min(self.max)
    }
}

/// Settings shared by every request of an `HttpClient`
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix for relative paths; absolute URLs are sent unchanged
    pub base_url: Option<String>,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// `None` disables client-side throttling
    pub rate_limit: Option<RateLimiterConfig>,
    /// Sent on every request before the request's own headers
    pub default_headers: StringMap,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: StringMap::new(),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Backoff curve between retries, capped at `max`
    pub fn backoff(mut self, backoff: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.retry = RetryPolicy {
            backoff,
            initial,
            max,
            ..self.config.retry
        };
        self
    }

    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Header sent with every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and rate limiting
///
/// Clones share the connection pool, the rate limiter and the token cache.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Client with default settings and no credentials
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            rate_limiter: config.rate_limit.as_ref().map(RateLimiter::new),
            authenticator: None,
            client,
            config,
        })
    }

    /// Client that authenticates every request with `auth_config`
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.set_authenticator(auth_config);
        Ok(client)
    }

    /// Replace the credentials; token requests reuse this client's pool
    pub fn set_authenticator(&mut self, auth_config: AuthConfig) {
        self.authenticator = Some(Authenticator::with_client(auth_config, self.client.clone()));
    }

    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// GET a path or absolute URL
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(&PageRequest::get(url), None).await
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        Ok(self.get(url).await?.json().await?)
    }

    /// POST a JSON body
    pub async fn post(&self, url: &str, body: JsonValue) -> Result<Response> {
        self.send(&PageRequest::new(Method::POST, url).json(body), None)
            .await
    }

    /// Send `request` and return the raw body
    ///
    /// `max_retries` overrides the configured retry count when set.
    pub async fn execute(&self, request: &PageRequest, max_retries: Option<u32>) -> Result<Bytes> {
        Ok(self.send(request, max_retries).await?.bytes().await?)
    }

    /// Send `request` until it succeeds or fails for good
    ///
    /// Retries 429, 5xx, timeouts and connection failures up to the retry
    /// limit. A 401 clears a cached OAuth2 token and is retried once with a
    /// fresh one; it does not count against the limit.
    pub async fn send(&self, request: &PageRequest, max_retries: Option<u32>) -> Result<Response> {
        let url = self.build_url(&request.url);
        let max_retries = max_retries.unwrap_or(self.config.retry.max_retries);

        let mut attempt = 0;
        let mut token_refreshed = false;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let can_retry = attempt < max_retries;
            let (builder, sent_token) = self.prepare(request, &url).await?;
            let outcome = match builder.send().await {
                Ok(response) => Outcome::from_response(response, can_retry),
                Err(e) => Outcome::from_send_error(e, self.config.timeout, can_retry),
            };

            let (delay, reason) = match outcome {
                Outcome::Success(response) => {
                    debug!(method = %request.method, url = %url, attempt, "Request succeeded");
                    return Ok(response);
                }
                Outcome::Unauthorized(response) => match (&self.authenticator, sent_token) {
                    (Some(auth), Some(rejected)) if auth.refreshes_tokens() && !token_refreshed => {
                        debug!(url = %url, "Unauthorized, refreshing token");
                        auth.clear_if(&rejected).await;
                        token_refreshed = true;
                        continue;
                    }
                    _ => return Err(status_error(response).await),
                },
                Outcome::Retry { delay, reason } => (
                    delay.unwrap_or_else(|| self.calculate_backoff(attempt)),
                    reason,
                ),
                Outcome::Fail(response) => return Err(status_error(response).await),
                Outcome::Error(e) => return Err(e),
            };

            warn!(
                url = %url,
                attempt = attempt + 1,
                max_attempts = max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                "{reason}, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One attempt of `request` against `url` and the bearer token it carries
    async fn prepare(
        &self,
        request: &PageRequest,
        url: &str,
    ) -> Result<(RequestBuilder, Option<String>)> {
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(self.config.timeout);

        for (key, value) in self.config.default_headers.iter().chain(&request.headers) {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let token = match &self.authenticator {
            Some(auth) => auth.bearer_token().await?,
            None => None,
        };
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }

        Ok((builder, token))
    }

    /// Resolve `path` against the base URL
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Delay before retrying after failed attempt `attempt`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        self.config.retry.delay(attempt)
    }
}

/// Remaining pages are fetched once: a failed page is dropped, never retried.
#[async_trait]
impl PageTransport for HttpClient {
    async fn fetch(&self, request: PageRequest) -> Result<Bytes> {
        self.execute(&request, Some(0)).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// What to do after a single attempt
enum Outcome {
    Success(Response),
    Unauthorized(Response),
    Retry {
        /// Server-requested delay; backoff applies when unset
        delay: Option<Duration>,
        reason: String,
    },
    Fail(Response),
    Error(Error),
}

impl Outcome {
    fn from_response(response: Response, can_retry: bool) -> Self {
        let status = response.status();

        if status.is_success() {
            return Self::Success(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Self::Unauthorized(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_seconds(&response);
            return if can_retry {
                Self::Retry {
                    delay: Some(Duration::from_secs(retry_after)),
                    reason: "Rate limited (429)".to_string(),
                }
            } else {
                Self::Error(Error::RateLimited {
                    retry_after_seconds: retry_after,
                })
            };
        }
        if can_retry && Error::http_status(status.as_u16(), "").is_retryable() {
            return Self::Retry {
                delay: None,
                reason: format!("Request failed with {}", status.as_u16()),
            };
        }

        Self::Fail(response)
    }

    fn from_send_error(e: reqwest::Error, timeout: Duration, can_retry: bool) -> Self {
        if e.is_timeout() {
            if can_retry {
                return Self::Retry {
                    delay: None,
                    reason: "Request timeout".to_string(),
                };
            }
            return Self::Error(Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        if e.is_connect() && can_retry {
            return Self::Retry {
                delay: None,
                reason: format!("Connection error: {e}"),
            };
        }

        Self::Error(Error::Http(e))
    }
}

/// Turn an error response into `Error::HttpStatus`, keeping the body
async fn status_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::http_status(status, body)
}

/// Seconds from the `Retry-After` header, one second when absent
fn retry_after_seconds(response: &Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1)
}
