//! Skip/limit pagination.

use serde::Serialize;
use travelhi_types::InputError;

/// Default number of items per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Largest page a caller may request from the report endpoints. Larger
/// limits are rejected, not clamped.
pub const MAX_PAGE_LIMIT: u32 = 200;

/// A validated skip/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    skip: u64,
    limit: u32,
}

impl Page {
    /// Build a page bounded by [`MAX_PAGE_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`InputError::PageLimit`] if `limit` is 0 or above the
    /// ceiling.
    pub fn new(skip: u64, limit: u32) -> Result<Self, InputError> {
        Self::with_ceiling(skip, limit, MAX_PAGE_LIMIT)
    }

    /// Build a page bounded by a caller-chosen ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::PageLimit`] if `limit` is outside `1..=max`.
    pub fn with_ceiling(skip: u64, limit: u32, max: u32) -> Result<Self, InputError> {
        if limit == 0 || limit > max {
            return Err(InputError::PageLimit { limit, max });
        }
        Ok(Self { skip, limit })
    }

    /// Number of items to skip.
    pub const fn skip(self) -> u64 {
        self.skip
    }

    /// Maximum number of items to return.
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Apply the window to an already ordered list.
    pub fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of results plus the number of matches across all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of matching items, independent of the window.
    pub total: u64,
}

impl<T> Paginated<T> {
    /// A page with no items and no matches.
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}
