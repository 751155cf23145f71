//! HTTP layer for Central API calls
//!
//! `HttpClient` sends one logical request as a series of attempts. Each
//! attempt waits on the shared rate limiter, carries a bearer token from
//! the authenticator, and is classified as success, retry or failure.
//!
//! A 401 from an OAuth2-authenticated client drops the cached token and
//! tries once more. 429 responses honour `Retry-After`. Remaining pages go
//! through `PageTransport` with a single attempt.

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RetryPolicy};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use transport::{PageRequest, PageTransport};
