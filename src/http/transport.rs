//! Request templates and the page transport seam
//!
//! A `PageRequest` captures everything needed to re-issue a request against a
//! different URL. The pagination pipeline clones the first page's request and
//! sends each copy through a `PageTransport`.

use crate::error::Result;
use crate::types::{JsonValue, StringMap};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;

/// A reusable HTTP request description
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL including query string
    pub url: String,
    /// Request headers (credentials are attached at send time)
    pub headers: StringMap,
    /// Optional JSON body
    pub body: Option<JsonValue>,
}

impl PageRequest {
    /// Create a request with the given method and URL
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: StringMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Derive a request for another URL
    ///
    /// Method and headers are copied; the body is carried only when the
    /// original request had one.
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            method: self.method.clone(),
            url: url.into(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Sends a single request and returns its raw body
///
/// Implementations must map 4xx/5xx responses to errors.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Fetch one page
    async fn fetch(&self, request: PageRequest) -> Result<Bytes>;
}
