//! Offset pagination helpers for article listings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 100;

/// A validated page window. Out-of-range inputs are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT);
        Self { page, limit }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results together with the totals needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> OffsetPage<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let limit = u64::from(request.limit());
        let page = request.page();
        Self {
            items,
            total,
            page,
            limit: request.limit(),
            pages: total.div_ceil(limit),
            has_next: u64::from(page) * limit < total,
            has_prev: page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> OffsetPage<U> {
        OffsetPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            pages: self.pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let request = PageRequest::new(None, None);
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), 10);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let request = PageRequest::new(Some(0), Some(150));
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), MAX_LIMIT);

        let request = PageRequest::new(Some(3), Some(0));
        assert_eq!(request.limit(), MIN_LIMIT);
        assert_eq!(request.offset(), 2);
    }

    #[test]
    fn page_totals() {
        let page = OffsetPage::new(vec![1, 2], 3, PageRequest::new(Some(1), Some(2)));
        assert_eq!(page.pages, 2);
        assert!(page.has_next);
        assert!(!page.has_prev);

        let last = OffsetPage::new(vec![3], 3, PageRequest::new(Some(2), Some(2)));
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: OffsetPage<u8> = OffsetPage::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(page.pages, 0);
        assert!(!page.has_next);
    }
}
