//! Auth configuration types

use chrono::{DateTime, Utc};

/// Default Sophos identity token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://id.sophos.com/api/v2/oauth2/token";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Pre-issued bearer token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 Client Credentials flow
    Oauth2ClientCredentials {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Requested scopes
        scopes: Vec<String>,
    },
}

impl AuthConfig {
    /// Client credentials against the default Sophos identity endpoint
    pub fn client_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::Oauth2ClientCredentials {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: vec!["token".to_string()],
        }
    }
}

/// Seconds before expiry at which a cached token is treated as stale
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// Access token held between requests
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// Bearer value sent in `Authorization`
    pub token: String,
    /// Absolute expiry, `None` for tokens that never expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Token issued now with an `expires_in` lifetime in seconds
    pub fn expires_in(token: String, seconds: i64) -> Self {
        Self::new(token, Some(Utc::now() + chrono::Duration::seconds(seconds)))
    }

    /// True once the token is within `EXPIRY_MARGIN_SECS` of its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| {
            Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) >= at
        })
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_inside_buffer() {
        let token = CachedToken::expires_in("test".to_string(), 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
    }

    #[test]
    fn test_client_credentials_defaults() {
        let AuthConfig::Oauth2ClientCredentials {
            token_url, scopes, ..
        } = AuthConfig::client_credentials("id", "secret")
        else {
            panic!("Expected client credentials");
        };
        assert_eq!(token_url, DEFAULT_TOKEN_URL);
        assert_eq!(scopes, vec!["token".to_string()]);
    }
}
