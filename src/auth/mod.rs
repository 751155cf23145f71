//! Authentication module
//!
//! Supports: static Bearer token, OAuth2 client credentials
//!
//! The `Authenticator` attaches the bearer credential to every outgoing
//! request and caches client-credentials tokens until shortly before they
//! expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken, DEFAULT_TOKEN_URL, EXPIRY_MARGIN_SECS};
