//! Offset pagination helpers for todo list queries.

use std::num::NonZeroU32;

use crate::domain::TodoPagination;

/// Row window handed to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: Option<u64>,
    pub limit: Option<u32>,
}

impl Window {
    /// Offset is `(page - 1) * limit` and only applies when both are present; a
    /// limit without a page windows from the first row.
    pub fn from_pagination(pagination: &TodoPagination) -> Self {
        let limit = pagination.limit.map(NonZeroU32::get);
        let offset = match (pagination.page, pagination.limit) {
            (Some(page), Some(limit)) => Some(u64::from(page.get() - 1) * u64::from(limit.get())),
            _ => None,
        };

        Self { offset, limit }
    }
}

/// Page count reported as `TodoPage::total`.
///
/// With a limit this is `ceil(matching / limit)`; without one the result is a
/// single unbounded window and the matching row count is returned.
pub fn page_count(matching: u64, limit: Option<NonZeroU32>) -> u64 {
    match limit {
        Some(limit) => matching.div_ceil(u64::from(limit.get())),
        None => matching,
    }
}
