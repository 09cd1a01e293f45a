//! Pagination types

use serde::Serialize;

/// Window into an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl PageRequest {
    /// Request for a 1-based page number; numbers below 1 are clamped to 1
    pub fn for_page(page: u32, per_page: u32) -> Self {
        let page = page.max(1);
        Self {
            limit: per_page,
            offset: u64::from(page - 1) * u64::from(per_page),
        }
    }
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` rows at `per_page` each
    pub fn total_pages(&self, per_page: u32) -> u32 {
        if per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(per_page)) as u32
    }
}
