//! Common types used throughout the Sophos Central client
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Region
// ============================================================================

/// Sophos Central data region
///
/// Each tenant lives in exactly one region; tenant-scoped calls must be sent
/// to that region's API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Eu01,
    Eu02,
    Us01,
    Us02,
    Us03,
}

impl Region {
    /// All known regions
    pub const ALL: [Region; 5] = [
        Region::Eu01,
        Region::Eu02,
        Region::Us01,
        Region::Us02,
        Region::Us03,
    ];

    /// Region identifier as used by the API (e.g. `eu01`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Eu01 => "eu01",
            Region::Eu02 => "eu02",
            Region::Us01 => "us01",
            Region::Us02 => "us02",
            Region::Us03 => "us03",
        }
    }

    /// Base URL of the regional API host
    pub fn base_url(&self) -> String {
        format!("https://api-{}.central.sophos.com", self.as_str())
    }

    /// Resolve a region from an API host URL
    ///
    /// Matching is case-insensitive and ignores a trailing slash.
    pub fn from_url(url: &str) -> Result<Self> {
        let normalized = url.trim().trim_end_matches('/').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|region| region.base_url() == normalized)
            .ok_or_else(|| Error::RegionNotFound {
                host: url.to_string(),
            })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::RegionNotFound {
                host: s.to_string(),
            })
    }
}

// ============================================================================
// Caller Identity Type
// ============================================================================

/// Kind of entity the API credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Partner,
    Organization,
    Tenant,
}

impl IdType {
    /// Header carrying the entity id on scoped requests
    pub fn header_name(&self) -> &'static str {
        match self {
            IdType::Partner => "X-Partner-ID",
            IdType::Organization => "X-Organization-ID",
            IdType::Tenant => "X-Tenant-ID",
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}
