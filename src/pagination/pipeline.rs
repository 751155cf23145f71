//! Concurrent page fetching
//!
//! URLs are turned into request templates and sent through the transport
//! with at most `concurrency` requests in flight. Bodies are collected in
//! completion order. Failed pages are counted and dropped.

use super::types::{FetchContext, RawPageBatch};
use crate::http::PageTransport;
use futures::future;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of pages fetched at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Bounded fan-out over a list of page URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFetchPipeline {
    concurrency: usize,
}

impl Default for PageFetchPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl PageFetchPipeline {
    /// Create a pipeline; a concurrency of zero is raised to one
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Maximum number of requests in flight
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every URL and collect the bodies that came back
    ///
    /// Each request copies the method and headers of the context's request.
    /// On cancellation no further URLs are dispatched, in-flight requests
    /// are abandoned and whatever completed so far is returned.
    pub async fn fetch_all(
        &self,
        transport: &dyn PageTransport,
        context: &FetchContext,
        urls: Vec<String>,
        cancel: &CancellationToken,
    ) -> RawPageBatch {
        let mut batch = RawPageBatch::with_capacity(urls.len());
        if urls.is_empty() {
            return batch;
        }

        debug!(
            pages = urls.len(),
            concurrency = self.concurrency,
            "Fetching remaining pages"
        );

        let mut fetches = stream::iter(urls)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|url| {
                let request = context.request().with_url(url);
                async move {
                    let url = request.url.clone();
                    (url, transport.fetch(request).await)
                }
            })
            .buffer_unordered(self.concurrency);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(fetched = batch.len(), "Page fetch cancelled");
                    break;
                }
                next = fetches.next() => match next {
                    Some((_, Ok(body))) => batch.push(body),
                    Some((url, Err(e))) => {
                        warn!(url = %url, error = %e, "Dropping page that failed to fetch");
                        batch.record_dropped();
                    }
                    None => break,
                },
            }
        }

        batch
    }
}
