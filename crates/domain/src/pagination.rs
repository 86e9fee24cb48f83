//! Page arithmetic for administrative listings.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    /// Validates `page >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
    pub fn new(page: u64, page_size: u64) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::InvalidPagination(
                "page must be at least 1".to_string(),
            ));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidPagination(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of records to skip.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Number of records to return.
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination block returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_orders: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Computes the block for `request` given the total matching count.
    pub fn compute(request: PageRequest, total_orders: u64) -> Self {
        let total_pages = total_orders.div_ceil(request.page_size);
        Self {
            current_page: request.page,
            total_pages,
            total_orders,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let request = PageRequest::new(2, 5).unwrap();
        assert_eq!(request.skip(), 5);
        assert_eq!(request.limit(), 5);

        let pagination = Pagination::compute(request, 25);
        assert_eq!(pagination.total_pages, 5);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn test_partial_last_page_rounds_up() {
        let pagination = Pagination::compute(PageRequest::new(3, 10).unwrap(), 21);
        assert_eq!(pagination.total_pages, 3);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn test_empty_result() {
        let pagination = Pagination::compute(PageRequest::default(), 0);
        assert_eq!(pagination.current_page, 1);
        assert_eq!(pagination.total_pages, 0);
        assert!(!pagination.has_next);
        assert!(!pagination.has_prev);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE).is_ok());
    }
}
