//! Sequential walking of from-key pages
//!
//! A from-key page only becomes addressable once the previous page has been
//! read, so these pages are fetched one at a time.

use super::strategies::from_key_url;
use super::types::{FetchContext, PagesEnvelope, RawPageBatch};
use crate::http::PageTransport;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Follows `nextKey` links from the first page until they run out
pub struct CursorWalker<'a> {
    transport: &'a dyn PageTransport,
}

impl<'a> CursorWalker<'a> {
    /// Create a walker over the given transport
    pub fn new(transport: &'a dyn PageTransport) -> Self {
        Self { transport }
    }

    /// Fetch every page after the first
    ///
    /// Stops on an empty or repeated key, a failed fetch, a body whose page
    /// metadata cannot be read, cancellation, or once the page total is
    /// reached.
    pub async fn walk(&self, context: &FetchContext, cancel: &CancellationToken) -> RawPageBatch {
        let mut batch = RawPageBatch::new();

        let base = match Url::parse(&context.request().url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %context.request().url, error = %e, "Cannot walk pages of invalid URL");
                return batch;
            }
        };

        let limit = context
            .pages()
            .total
            .map_or(u64::MAX, |total| total.saturating_sub(1));
        let mut seen = HashSet::new();
        let mut next_key = context.pages().next_key().map(str::to_owned);

        while let Some(key) = next_key.take() {
            if batch.len() as u64 >= limit {
                debug!(pages = batch.len(), "Page total reached");
                break;
            }
            if !seen.insert(key.clone()) {
                warn!(key = %key, "Server repeated a page key, stopping");
                break;
            }

            let request = context
                .request()
                .with_url(String::from(from_key_url(&base, &key)));

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(fetched = batch.len(), "Page walk cancelled");
                    break;
                }
                result = self.transport.fetch(request) => result,
            };

            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping page that failed to fetch");
                    batch.record_dropped();
                    break;
                }
            };

            match serde_json::from_slice::<PagesEnvelope>(&body) {
                Ok(envelope) => next_key = envelope.pages.next_key().map(str::to_owned),
                Err(e) => warn!(key = %key, error = %e, "Page has no readable metadata, stopping"),
            }
            batch.push(body);
        }

        batch
    }
}
