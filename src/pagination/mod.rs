//! Pagination module
//!
//! Supports: offset pages (`?page=N`) and from-key pages (`?pageFromKey=K`)
//!
//! # Overview
//!
//! List endpoints return the first page together with a `pages` object. The
//! engine reads that metadata, works out which pages are still missing,
//! fetches them and appends their items to the first page:
//!
//! - `remaining_page_count` / `remaining_page_urls` - page arithmetic
//! - `PageFetchPipeline` - bounded concurrent fetching of offset pages
//! - `CursorWalker` - sequential fetching of from-key pages
//! - `merge_into` - decodes fetched pages and appends their items
//! - `Paginator` - ties the above together

mod aggregate;
mod cursor;
mod engine;
mod pipeline;
mod strategies;
mod types;

pub use aggregate::merge_into;
pub use cursor::CursorWalker;
pub use engine::Paginator;
pub use pipeline::{PageFetchPipeline, DEFAULT_CONCURRENCY};
pub use strategies::{
    from_key_url, remaining_page_count, remaining_page_urls, with_query_param, PAGE_FROM_KEY_PARAM,
    PAGE_PARAM, PAGE_SIZE_PARAM, PAGE_TOTAL_PARAM,
};
pub use types::{
    Collected, FetchContext, ListResponse, PageStyle, PagedResponse, Pages, RawPageBatch,
    MISSING_PAGE_TOTAL,
};
