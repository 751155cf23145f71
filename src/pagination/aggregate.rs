//! Merging fetched pages into the first page

use super::types::{Collected, PagedResponse, RawPageBatch};
use tracing::warn;

/// Append the items of every page in `batch` to `base`
///
/// Pages are decoded as the same response type as `base` and appended in
/// batch order. A page that fails to decode is skipped and counted as
/// dropped. The page metadata of `base` is left untouched.
pub fn merge_into<R: PagedResponse>(mut base: R, batch: RawPageBatch) -> Collected<R> {
    let mut merged = 0;
    let mut dropped = batch.dropped();

    for body in batch.into_pages() {
        match serde_json::from_slice::<R>(&body) {
            Ok(page) => {
                base.items_mut().extend(page.into_items());
                merged += 1;
            }
            Err(e) => {
                warn!(error = %e, bytes = body.len(), "Skipping page that failed to decode");
                dropped += 1;
            }
        }
    }

    Collected {
        response: base,
        pages_merged: merged,
        pages_dropped: dropped,
    }
}
