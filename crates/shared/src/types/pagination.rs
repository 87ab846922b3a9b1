//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: u32 = 5;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page, within `[5, 50]`.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Checks `page >= 1` and `page_size` in `[5, 50]`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first violated bound.
    pub fn validate(&self) -> Result<(), String> {
        if self.page < 1 {
            return Err("page must be at least 1".to_string());
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(format!(
                "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"
            ));
        }
        Ok(())
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Total number of matching items across all pages.
    pub total: u64,
    /// The items in the current page.
    pub items: Vec<T>,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { total, items }
    }

    /// Maps every item, keeping the total.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_page_request_default() {
        let request = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 20);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(2, 20).offset(), 20);
        assert_eq!(PageRequest::new(3, 5).offset(), 10);
        assert_eq!(PageRequest::new(3, 5).limit(), 5);
    }

    #[rstest]
    #[case(1, 5, true)]
    #[case(1, 50, true)]
    #[case(1, 4, false)]
    #[case(1, 51, false)]
    #[case(0, 10, false)]
    fn test_page_request_bounds(#[case] page: u32, #[case] size: u32, #[case] ok: bool) {
        assert_eq!(PageRequest::new(page, size).validate().is_ok(), ok);
    }

    #[test]
    fn test_page_response_map() {
        let response = PageResponse::new(vec![1, 2, 3], 25);
        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.total, 25);
        assert_eq!(mapped.items, vec![10, 20, 30]);
    }
}
