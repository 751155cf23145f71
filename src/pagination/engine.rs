//! Pagination engine
//!
//! Given the first page of a list, fetches the rest and merges them in.

use super::aggregate::merge_into;
use super::cursor::CursorWalker;
use super::pipeline::PageFetchPipeline;
use super::strategies::remaining_page_urls;
use super::types::{Collected, FetchContext, PageStyle, PagedResponse, RawPageBatch};
use crate::error::Result;
use crate::http::{PageRequest, PageTransport};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Collects the remaining pages of a list response
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator {
    pipeline: PageFetchPipeline,
}

impl Paginator {
    /// Create a paginator fetching up to `concurrency` offset pages at once
    pub fn new(concurrency: usize) -> Self {
        Self {
            pipeline: PageFetchPipeline::new(concurrency),
        }
    }

    /// The underlying fetch pipeline
    pub fn pipeline(&self) -> &PageFetchPipeline {
        &self.pipeline
    }

    /// Fetch the raw bodies of every page after the first
    pub async fn fetch_remaining(
        &self,
        transport: &dyn PageTransport,
        context: &FetchContext,
        cancel: &CancellationToken,
    ) -> RawPageBatch {
        match context.pages().style() {
            PageStyle::Offset => {
                let pages = context.pages();
                let urls = remaining_page_urls(&context.request().url, pages);
                let by_items = pages.remaining_by_items();
                if by_items != urls.len() as u64 {
                    debug!(
                        by_total = urls.len(),
                        by_items,
                        page_size = pages.page_size(),
                        "Page total and item count disagree, following page total"
                    );
                }
                self.pipeline
                    .fetch_all(transport, context, urls, cancel)
                    .await
            }
            PageStyle::FromKey => CursorWalker::new(transport).walk(context, cancel).await,
        }
    }

    /// Fetch every page after `base` and append their items to it
    ///
    /// `request` is the request that produced `base`. Fails only when the
    /// page metadata of `base` is unusable; fetch and decode failures reduce
    /// the item count and show up in [`Collected::pages_dropped`].
    pub async fn collect_remaining<R: PagedResponse>(
        &self,
        transport: &dyn PageTransport,
        request: &PageRequest,
        base: R,
        cancel: &CancellationToken,
    ) -> Result<Collected<R>> {
        let context = FetchContext::new(request.clone(), base.pages().clone())?;
        let batch = self.fetch_remaining(transport, &context, cancel).await;
        let collected = merge_into(base, batch);

        info!(
            merged = collected.pages_merged,
            dropped = collected.pages_dropped,
            cancelled = cancel.is_cancelled(),
            "Collected remaining pages"
        );

        Ok(collected)
    }
}
