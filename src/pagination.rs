use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Zero-based page request as posted by the listing table.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page_number: usize,
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: usize,
}

fn default_rows_per_page() -> usize {
    10
}

impl PageRequest {
    pub fn rows_per_page(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.rows_per_page)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Page<T> {
    pub page: Vec<T>,
    pub total_pages: usize,
}

pub fn total_pages(total: usize, rows_per_page: NonZeroUsize) -> usize {
    total.div_ceil(rows_per_page.get())
}

/// Slices `[page_number * rows_per_page, +rows_per_page)` out of the full set.
/// A page past the end is empty.
pub fn paginate<T>(items: Vec<T>, page_number: usize, rows_per_page: NonZeroUsize) -> Page<T> {
    let total_pages = total_pages(items.len(), rows_per_page);
    let page = match page_number.checked_mul(rows_per_page.get()) {
        Some(start) => items
            .into_iter()
            .skip(start)
            .take(rows_per_page.get())
            .collect(),
        None => Vec::new(),
    };
    Page { page, total_pages }
}
