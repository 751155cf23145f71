//! Client configuration
//!
//! Configuration is read from a YAML (or JSON) file and then overlaid with
//! `SOPHOS_*` environment variables, so credentials can stay out of files.

use crate::auth::{AuthConfig, DEFAULT_TOKEN_URL};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::pagination::DEFAULT_CONCURRENCY;
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding `client_id`
pub const ENV_CLIENT_ID: &str = "SOPHOS_CLIENT_ID";
/// Environment variable overriding `client_secret`
pub const ENV_CLIENT_SECRET: &str = "SOPHOS_CLIENT_SECRET";
/// Environment variable overriding `token_url`
pub const ENV_TOKEN_URL: &str = "SOPHOS_TOKEN_URL";
/// Environment variable overriding `global_url`
pub const ENV_GLOBAL_URL: &str = "SOPHOS_GLOBAL_URL";

/// Default global API host
pub const DEFAULT_GLOBAL_URL: &str = "https://api.central.sophos.com";

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Everything needed to talk to Sophos Central
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// OAuth2 client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret
    #[serde(default)]
    pub client_secret: String,

    /// Token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Scopes requested with the token
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Global API host used for whoami and partner/organization calls
    #[serde(default = "default_global_url")]
    pub global_url: String,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Pagination configuration
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            global_url: default_global_url(),
            http: HttpConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["token".to_string()]
}

fn default_global_url() -> String {
    DEFAULT_GLOBAL_URL.to_string()
}

impl ClientConfig {
    /// Load a config file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Build a config from defaults and environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Parse a config document
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overlay values returned by `lookup`; empty values are ignored
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(value) = get(ENV_CLIENT_ID) {
            self.client_id = value;
        }
        if let Some(value) = get(ENV_CLIENT_SECRET) {
            self.client_secret = value;
        }
        if let Some(value) = get(ENV_TOKEN_URL) {
            self.token_url = value;
        }
        if let Some(value) = get(ENV_GLOBAL_URL) {
            self.global_url = value;
        }
    }

    /// Check the config is usable
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::missing_field("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(Error::missing_field("client_secret"));
        }

        Url::parse(&self.token_url)
            .map_err(|e| Error::invalid_value("token_url", e.to_string()))?;
        Url::parse(&self.global_url)
            .map_err(|e| Error::invalid_value("global_url", e.to_string()))?;

        if self.pagination.concurrency == 0 {
            return Err(Error::invalid_value(
                "pagination.concurrency",
                "must be at least 1",
            ));
        }
        if self.pagination.page_size == Some(0) {
            return Err(Error::invalid_value(
                "pagination.page_size",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Authentication settings for the client-credentials flow
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::Oauth2ClientCredentials {
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: self.scopes.clone(),
        }
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let http = &self.http;
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(http.timeout_seconds))
            .max_retries(http.max_retries)
            .backoff(
                http.retry_backoff.backoff_type,
                Duration::from_millis(http.retry_backoff.initial_ms),
                Duration::from_millis(http.retry_backoff.max_ms),
            );

        builder = if http.rate_limit.enabled {
            builder.rate_limit(RateLimiterConfig::new(
                http.rate_limit.requests_per_second,
                http.rate_limit.burst_size,
            ))
        } else {
            builder.no_rate_limit()
        };

        builder.build()
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries for first-page and identity requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether requests are throttled at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Requests allowed in a single burst
    #[serde(default = "default_rps")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_rps(),
            burst_size: default_rps(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rps() -> u32 {
    10
}

// ============================================================================
// Pagination Config
// ============================================================================

/// Pagination configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Maximum number of pages fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Page size requested on the first page; server default when unset
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            page_size: None,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
