//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 1000,
        }
    }
}

impl PaginationConfig {
    /// Resolve the requested page, falling back to the first page and the
    /// default page size.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] if the page is zero or so large that it
    /// starts past the last row SQLite can address, or if the page size is
    /// zero or larger than [PaginationConfig::max_page_size].
    pub fn resolve(&self, page: Option<u64>, per_page: Option<u64>) -> Result<Page, Error> {
        let number = page.unwrap_or(1);
        let size = per_page.unwrap_or(self.default_page_size);

        if number == 0 {
            return Err(Error::InvalidInput("page must be at least 1".to_owned()));
        }

        if size == 0 || size > self.max_page_size {
            return Err(Error::InvalidInput(format!(
                "per_page must be between 1 and {}",
                self.max_page_size
            )));
        }

        let offset = (number - 1)
            .checked_mul(size)
            .and_then(|offset| i64::try_from(offset).ok());
        if offset.is_none() {
            return Err(Error::InvalidInput(format!("page {number} is too large")));
        }

        Ok(Page { number, size })
    }
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-based page number.
    pub number: u64,
    /// The number of items per page.
    pub size: u64,
}

impl Page {
    /// The number of items to return, as an SQL `LIMIT`.
    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }

    /// The number of items to skip, as an SQL `OFFSET`.
    ///
    /// Saturates at [i64::MAX] for pages that were not checked by
    /// [PaginationConfig::resolve].
    pub fn offset(&self) -> i64 {
        let offset = self.number.saturating_sub(1).saturating_mul(self.size);
        i64::try_from(offset).unwrap_or(i64::MAX)
    }
}

/// One page of items and where it sits in the full list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// The number of items across all pages.
    pub total: u64,
    /// The 1-based page number.
    pub page: u64,
    /// The page size.
    pub per_page: u64,
    /// The number of pages.
    pub page_count: u64,
}

impl<T> Paged<T> {
    /// Wrap the items of `page` given the total number of items.
    pub fn new(items: Vec<T>, total: u64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.number,
            per_page: page.size,
            page_count: total.div_ceil(page.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        pagination::{Page, PaginationConfig, Paged},
    };

    #[test]
    fn defaults_to_first_page() {
        let config = PaginationConfig::default();

        let page = config.resolve(None, None).unwrap();

        assert_eq!(
            page,
            Page {
                number: 1,
                size: config.default_page_size
            }
        );
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let page = PaginationConfig::default().resolve(Some(3), Some(20)).unwrap();

        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn rejects_page_zero_and_oversized_pages() {
        let config = PaginationConfig {
            default_page_size: 10,
            max_page_size: 100,
        };

        assert!(matches!(config.resolve(Some(0), None), Err(Error::InvalidInput(_))));
        assert!(matches!(config.resolve(None, Some(0)), Err(Error::InvalidInput(_))));
        assert!(matches!(config.resolve(None, Some(101)), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn rejects_pages_past_the_addressable_rows() {
        let config = PaginationConfig::default();

        for page in [u64::MAX, u64::MAX / 2, i64::MAX as u64] {
            assert!(
                matches!(config.resolve(Some(page), Some(50)), Err(Error::InvalidInput(_))),
                "page {page} should be rejected"
            );
        }
    }

    #[test]
    fn unchecked_pages_saturate_instead_of_overflowing() {
        let page = Page {
            number: u64::MAX,
            size: u64::MAX,
        };

        assert_eq!(page.offset(), i64::MAX);
        assert_eq!(page.limit(), i64::MAX);
    }

    #[test]
    fn page_count_rounds_up() {
        let page = Page { number: 1, size: 20 };

        assert_eq!(Paged::new(vec![1], 41, page).page_count, 3);
        assert_eq!(Paged::new(Vec::<i32>::new(), 0, page).page_count, 0);
        assert_eq!(Paged::new(vec![1], 40, page).page_count, 2);
    }
}
