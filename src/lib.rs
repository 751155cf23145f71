// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Sophos Central client
//!
//! An async client for the Sophos Central REST API. List endpoints return
//! one page at a time; this crate reads the page metadata of the first page
//! and fetches the rest concurrently.
//!
//! ## Features
//!
//! - **OAuth2 client credentials**: Token caching with early refresh
//! - **Caller identity**: whoami, tenant scoping and regional hosts
//! - **Pagination**: Bounded concurrent offset pages, sequential from-key pages
//! - **Resilience**: Rate limiting and retries with backoff for first pages
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sophos_central::{CentralClient, ClientConfig, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::from_env();
//!     let mut client = CentralClient::new(&config)?;
//!     client.whoami().await?;
//!
//!     let endpoints = client
//!         .list_all::<serde_json::Value>("/endpoint/v1/endpoints", &[], &CancellationToken::new())
//!         .await?;
//!     println!("{} endpoints", endpoints.response.items.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CentralClient                         │
//! │   whoami() → Scope     list() → page 1    list_all() → all  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────┬──────────────┬───┴──────────────────────────────┐
//! │   Auth   │    HTTP      │            Pagination            │
//! ├──────────┼──────────────┼──────────────────────────────────┤
//! │ OAuth2   │ Retry        │ Remaining pages → URLs           │
//! │ Bearer   │ Rate Limit   │ Bounded fetch  → raw batch       │
//! │          │ Backoff      │ From-key walk  → raw batch       │
//! │          │ PageTransport│ Merge          → first page      │
//! └──────────┴──────────────┴──────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Page calculation, concurrent fetching and merging
pub mod pagination;

/// Client configuration
pub mod config;

/// Sophos Central API client
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::{CentralClient, WhoAmI};
pub use config::ClientConfig;
pub use pagination::{Collected, ListResponse, Pages, Paginator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
