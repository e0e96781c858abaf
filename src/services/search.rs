//! Filtering and pagination over a ranked area snapshot
//!
//! Records arrive already ranked by the cache; this engine only narrows
//! and slices. A text query matches case-insensitively against each
//! record's search blob, a category filter matches the subcategory
//! exactly, and both may combine. Page numbers clamp into the valid
//! range instead of erroring.

use crate::domain::business::{Business, BusinessRecord};

/// Filters and paging for one search.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: String,
    pub category: String,
    pub page: usize,
    pub per_page: usize,
}

/// One page of results plus the paging envelope.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub items: Vec<Business>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Narrow and slice a ranked record list. Never re-sorts.
pub fn search(records: &[BusinessRecord], params: &SearchParams) -> SearchPage {
    let query = params.query.trim().to_lowercase();
    let category = params.category.trim();

    let matches: Vec<&BusinessRecord> = records
        .iter()
        .filter(|record| query.is_empty() || record.search_blob.contains(&query))
        .filter(|record| category.is_empty() || record.business.subcategory == category)
        .collect();

    let per_page = params.per_page.max(1);
    let total = matches.len();
    // An empty result still reports one (empty) page.
    let total_pages = total.div_ceil(per_page).max(1);
    let page = params.page.clamp(1, total_pages);

    let items = matches
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(|record| record.business.clone())
        .collect();

    SearchPage {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}
