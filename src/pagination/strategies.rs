//! Page arithmetic and URL generation
//!
//! Pure functions: nothing here performs I/O.

use super::types::Pages;
use url::Url;

/// Query parameter selecting an offset page
pub const PAGE_PARAM: &str = "page";

/// Query parameter selecting a from-key page
pub const PAGE_FROM_KEY_PARAM: &str = "pageFromKey";

/// Query parameter asking the server for page totals
pub const PAGE_TOTAL_PARAM: &str = "pageTotal";

/// Query parameter setting the page size
pub const PAGE_SIZE_PARAM: &str = "pageSize";

// ============================================================================
// Remaining Page Calculator
// ============================================================================

/// Number of pages still needed to cover `total_items`
///
/// Returns 0 once `fetched_items` reaches the total, otherwise the ceiling
/// of the outstanding items over `max_page_size`. A zero page size yields 0;
/// callers are expected to reject it before getting here.
pub fn remaining_page_count(total_items: u64, fetched_items: u64, max_page_size: u64) -> u64 {
    if fetched_items >= total_items || max_page_size == 0 {
        return 0;
    }

    (total_items - fetched_items).div_ceil(max_page_size)
}

// ============================================================================
// URL Sequence Generator
// ============================================================================

/// URLs for every offset page after the current one
///
/// Pages `current + 1` through `total` are produced in ascending order.
/// Only the `page` parameter is rewritten; every other query parameter is
/// carried over. An unparseable URL yields no URLs.
pub fn remaining_page_urls(last_url: &str, pages: &Pages) -> Vec<String> {
    let Ok(url) = Url::parse(last_url) else {
        return Vec::new();
    };

    let first = pages.current_page().saturating_add(1);
    let last = pages.total.unwrap_or(0);

    (first..=last)
        .map(|page| String::from(with_query_param(&url, PAGE_PARAM, &page.to_string())))
        .collect()
}

/// URL of the page identified by `key` on a from-key endpoint
pub fn from_key_url(url: &Url, key: &str) -> Url {
    with_query_param(url, PAGE_FROM_KEY_PARAM, key)
}

/// Set a query parameter, replacing any existing values in place
///
/// The first occurrence keeps its position; later duplicates are removed.
/// A parameter that was absent is appended.
pub fn with_query_param(url: &Url, key: &str, value: &str) -> Url {
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (k, v) in url.query_pairs() {
        if k == key {
            if !replaced {
                pairs.push((k.into_owned(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }

    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }

    let mut next = url.clone();
    next.query_pairs_mut().clear().extend_pairs(pairs);
    next
}
