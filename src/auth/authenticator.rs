//! Authenticator implementation
//!
//! Attaches the bearer credential to requests. Client-credentials tokens are
//! requested from the identity service on first use and reused until they
//! are about to expire.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Authenticator handles applying authentication to HTTP requests
///
/// Cloning is cheap and clones share the token cache.
#[derive(Clone)]
pub struct Authenticator {
    config: AuthConfig,
    token: Arc<RwLock<Option<CachedToken>>>,
    client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator that requests tokens through `client`
    pub fn with_client(config: AuthConfig, client: Client) -> Self {
        Self {
            config,
            token: Arc::new(RwLock::new(None)),
            client,
        }
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Whether tokens are issued by a token endpoint and can be renewed
    pub fn refreshes_tokens(&self) -> bool {
        matches!(self.config, AuthConfig::Oauth2ClientCredentials { .. })
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self.bearer_token().await? {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    /// The bearer token to send, if any
    pub async fn bearer_token(&self) -> Result<Option<String>> {
        match &self.config {
            AuthConfig::None => Ok(None),
            AuthConfig::Bearer { token } => Ok(Some(token.clone())),
            AuthConfig::Oauth2ClientCredentials { .. } => self.cached_or_fetch().await.map(Some),
        }
    }

    /// Drop the cached token so the next request fetches a new one
    pub async fn clear_cache(&self) {
        *self.token.write().await = None;
    }

    /// Drop the cached token only if it is still `rejected`
    ///
    /// Concurrent requests that were refused with the same token then
    /// trigger a single refresh.
    pub async fn clear_if(&self, rejected: &str) {
        let mut slot = self.token.write().await;
        if slot.as_ref().is_some_and(|t| t.token == rejected) {
            *slot = None;
        }
    }

    async fn cached_or_fetch(&self) -> Result<String> {
        if let Some(token) = self.valid_cached().await {
            return Ok(token);
        }

        let mut slot = self.token.write().await;
        // Another task may have fetched while this one waited for the lock
        if let Some(token) = slot.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.token.clone());
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(access_token)
    }

    async fn valid_cached(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.token.clone())
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let AuthConfig::Oauth2ClientCredentials {
            token_url,
            client_id,
            client_secret,
            scopes,
        } = &self.config
        else {
            return Err(Error::auth("Token refresh not supported for this auth type"));
        };

        let scope = scopes.join(" ");
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        debug!(token_url, client_id, "Requesting access token");

        let response = self.client.post(token_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::OAuth2 {
                message: format!("token endpoint returned {}: {}", status.as_u16(), body),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| Error::OAuth2 {
            message: format!("unreadable token response: {e}"),
        })?;
        token.into_cached_token()
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.config {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::Oauth2ClientCredentials { .. } => "oauth2_client_credentials",
        };
        f.debug_struct("Authenticator")
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}

/// Token endpoint response
///
/// The identity service reports some failures with a 200 status, an empty
/// token and an `errorCode`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(default, rename = "access_token")]
    access_token: String,
    #[serde(default, rename = "expires_in")]
    expires_in: Option<i64>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TokenResponse {
    fn into_cached_token(self) -> Result<CachedToken> {
        if self.access_token.is_empty() {
            return Err(Error::OAuth2 {
                message: format!(
                    "no access token issued ({}): {}",
                    self.error_code.as_deref().unwrap_or("unknown"),
                    self.message.as_deref().unwrap_or_default()
                ),
            });
        }

        Ok(match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        })
    }
}
