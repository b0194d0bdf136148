//! Pagination
//!
//! Fixed-size pages over an ordered sequence. The requested page number comes
//! straight from the `page` query parameter and is resolved against the total
//! item count:
//!
//! - missing or non-numeric selects page 1,
//! - past the end clamps to the last page,
//! - below 1 clamps to page 1.
//!
//! An empty sequence still has exactly one (empty) page.

use serde::Serialize;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A page request, before it is resolved against a total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested page number, unclamped
    pub requested: i64,
    /// Items per page (at least 1)
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            requested: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(requested: i64, per_page: u32) -> Self {
        Self {
            requested,
            per_page: per_page.max(1),
        }
    }

    /// Build a request from the raw `page` query value.
    pub fn from_query(raw: Option<&str>, per_page: u32) -> Self {
        let requested = raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(1);
        Self::new(requested, per_page)
    }

    /// Number of pages needed for `total` items (never zero)
    pub fn num_pages(&self, total: i64) -> i64 {
        let per_page = i64::from(self.per_page);
        let total = total.max(0);
        ((total + per_page - 1) / per_page).max(1)
    }

    /// The page number actually served for `total` items
    pub fn resolve(&self, total: i64) -> i64 {
        self.requested.clamp(1, self.num_pages(total))
    }

    /// Row offset of the resolved page
    pub fn offset(&self, total: i64) -> i64 {
        (self.resolve(total) - 1) * i64::from(self.per_page)
    }

    /// Row limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of results plus the metadata templates need for navigation
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: i64,
    /// Total number of pages (at least 1)
    pub num_pages: i64,
    /// Total item count across all pages
    pub total: i64,
    pub per_page: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<i64>,
    pub next_page_number: Option<i64>,
}

impl<T> Page<T> {
    /// Wrap an already-fetched slice of `total` items
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        let number = request.resolve(total);
        let num_pages = request.num_pages(total);
        let has_previous = number > 1;
        let has_next = number < num_pages;
        Self {
            items,
            number,
            num_pages,
            total: total.max(0),
            per_page: request.per_page,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| number - 1),
            next_page_number: has_next.then(|| number + 1),
        }
    }

    /// Slice an in-memory ordered sequence
    pub fn from_vec(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len() as i64;
        let offset = request.offset(total) as usize;
        let items = all
            .into_iter()
            .skip(offset)
            .take(request.per_page as usize)
            .collect();
        Self::new(items, total, request)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
