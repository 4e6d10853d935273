//! Paged results.

use serde::{Deserialize, Serialize};

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// The result items.
    pub items: Vec<T>,
    /// Total number of matching items.
    pub total: i64,
    /// Current page (1-indexed).
    pub page: i64,
    /// Items per page.
    pub per_page: i64,
    /// Total number of pages (at least 1).
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = if total <= 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        };

        Self {
            items,
            total,
            page: page.max(1),
            per_page,
            total_pages,
        }
    }

    /// Whether there's a next page.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Convert the items, keeping the paging info.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_basics() {
        let p = Page::new(vec![1, 2], 45, 2, 10);
        assert_eq!(p.total_pages, 5);
        assert!(p.has_next());
        assert!(p.has_prev());
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_page_last_and_empty() {
        let p = Page::new(vec![1], 41, 5, 10);
        assert!(!p.has_next());

        let empty: Page<i32> = Page::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.is_empty());
        assert!(!empty.has_next());
    }

    #[test]
    fn test_page_map() {
        let p = Page::new(vec![1, 2, 3], 3, 1, 10).map(|n| n * 2);
        assert_eq!(p.items, vec![2, 4, 6]);
        assert_eq!(p.total, 3);
    }
}
