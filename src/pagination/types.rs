//! Pagination types
//!
//! Page metadata as returned by list endpoints, the validated context the
//! engine runs against, and the raw batch handed to the aggregator.

use super::strategies::remaining_page_count;
use crate::error::{Error, Result};
use crate::http::PageRequest;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Message returned when a list response carries no page totals
pub const MISSING_PAGE_TOTAL: &str =
    "must include pageTotal=true in initial request query args";

// ============================================================================
// Page Descriptor
// ============================================================================

/// Page metadata from the `pages` object of a list response
///
/// All fields are optional on the wire. `total` counts pages, `items` counts
/// records across every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pages {
    /// 1-based index of the page just received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,

    /// Key the page was requested with (from-key endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_key: Option<String>,

    /// Key for the next page (from-key endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_key: Option<String>,

    /// Number of items on the page just received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Total number of pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Total number of items across all pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<u64>,

    /// Largest page size the server will return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

/// How an endpoint addresses subsequent pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStyle {
    /// `?page=N`, pages can be fetched in any order
    Offset,
    /// `?pageFromKey=K`, each page names the next one
    FromKey,
}

impl Pages {
    /// Pagination style implied by the metadata
    pub fn style(&self) -> PageStyle {
        if self.from_key.is_some() || self.next_key.is_some() {
            PageStyle::FromKey
        } else {
            PageStyle::Offset
        }
    }

    /// Non-empty next key, if any
    pub fn next_key(&self) -> Option<&str> {
        self.next_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Current page, treating a missing value as the first page
    pub fn current_page(&self) -> u64 {
        self.current.unwrap_or(1)
    }

    /// Check whether pages beyond the one just received exist
    pub fn has_more(&self) -> bool {
        match self.style() {
            PageStyle::Offset => self.total.unwrap_or(0) > self.current_page(),
            PageStyle::FromKey => self.next_key().is_some(),
        }
    }

    /// Page size the server actually used
    ///
    /// `maxSize` is only the server's ceiling, so the observed `size` wins
    /// whenever it is reported.
    pub fn page_size(&self) -> u64 {
        self.size
            .filter(|&size| size > 0)
            .or(self.max_size)
            .unwrap_or(0)
    }

    /// Items delivered by pages up to and including the current one
    ///
    /// Every page so far is assumed to hold `page_size()` items.
    pub fn items_fetched(&self) -> u64 {
        self.current_page().saturating_mul(self.page_size())
    }

    /// Pages still to fetch according to the item counts
    ///
    /// Only a cross-check: `total` decides which pages are requested.
    pub fn remaining_by_items(&self) -> u64 {
        remaining_page_count(
            self.items.unwrap_or(0),
            self.items_fetched(),
            self.page_size(),
        )
    }

    /// Validate the metadata before handing it to the engine
    pub fn validate(&self) -> Result<()> {
        if self.total.unwrap_or(0) == 0 || self.items.unwrap_or(0) == 0 {
            return Err(Error::pagination(MISSING_PAGE_TOTAL));
        }

        if self.style() == PageStyle::Offset {
            if self.max_size.unwrap_or(0) == 0 {
                return Err(Error::pagination("maxSize must be greater than zero"));
            }
            if self.current == Some(0) {
                return Err(Error::pagination("current page is 1-based"));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// The first page's request paired with its page metadata
///
/// Only constructed through [`FetchContext::new`], so every context the
/// engine sees has been validated.
#[derive(Debug, Clone)]
pub struct FetchContext {
    request: PageRequest,
    pages: Pages,
}

impl FetchContext {
    /// Create a context, rejecting metadata without page totals
    pub fn new(request: PageRequest, pages: Pages) -> Result<Self> {
        pages.validate()?;
        Ok(Self { request, pages })
    }

    /// Request that produced the first page
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Metadata of the first page
    pub fn pages(&self) -> &Pages {
        &self.pages
    }
}

// ============================================================================
// Raw Page Batch
// ============================================================================

/// Response bodies collected by the fetch pipeline, in completion order
#[derive(Debug, Clone, Default)]
pub struct RawPageBatch {
    pages: Vec<Bytes>,
    dropped: usize,
}

impl RawPageBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` pages
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: Vec::with_capacity(capacity),
            dropped: 0,
        }
    }

    /// Add a successfully fetched body
    pub fn push(&mut self, body: Bytes) {
        self.pages.push(body);
    }

    /// Count a page that failed to fetch
    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Number of bodies in the batch
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if the batch holds no bodies
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of pages that failed to fetch
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Iterate over the bodies
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.pages.iter()
    }

    /// Take the bodies out of the batch
    pub fn into_pages(self) -> Vec<Bytes> {
        self.pages
    }
}

// ============================================================================
// Paged Responses
// ============================================================================

/// A list response that carries its own page metadata
pub trait PagedResponse: DeserializeOwned + Send {
    /// Element type of the item list
    type Item;

    /// Page metadata of this response
    fn pages(&self) -> &Pages;

    /// Mutable access to the item list
    fn items_mut(&mut self) -> &mut Vec<Self::Item>;

    /// Consume the response, keeping only its items
    fn into_items(self) -> Vec<Self::Item>;
}

/// The `{ "items": [...], "pages": {...} }` envelope shared by list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Items on this page (or every page, once merged)
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    /// Page metadata
    #[serde(default)]
    pub pages: Pages,
}

impl<T: DeserializeOwned + Send> PagedResponse for ListResponse<T> {
    type Item = T;

    fn pages(&self) -> &Pages {
        &self.pages
    }

    fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Only the `pages` object of a response body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PagesEnvelope {
    #[serde(default)]
    pub pages: Pages,
}

/// Outcome of collecting every page of a list
#[derive(Debug, Clone)]
pub struct Collected<R> {
    /// The first page with every fetched page's items appended
    pub response: R,
    /// Additional pages fetched and decoded
    pub pages_merged: usize,
    /// Pages that failed to fetch or decode
    pub pages_dropped: usize,
}

impl<R> Collected<R> {
    /// Wrap a response that needed no further pages
    pub fn single(response: R) -> Self {
        Self {
            response,
            pages_merged: 0,
            pages_dropped: 0,
        }
    }

    /// Check if every page made it into the response
    pub fn is_complete(&self) -> bool {
        self.pages_dropped == 0
    }

    /// Unwrap the merged response
    pub fn into_inner(self) -> R {
        self.response
    }
}
