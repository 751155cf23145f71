//! Sophos Central client
//!
//! Identifies the caller via whoami, scopes requests with the matching
//! `X-*-ID` header and host, and exposes list endpoints with optional
//! collection of every page.

mod central;
mod types;

pub use central::CentralClient;
pub use types::{ApiHosts, Scope, WhoAmI};

#[cfg(test)]
mod tests;
