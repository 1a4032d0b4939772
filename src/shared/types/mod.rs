//! Shared type definitions

use serde::{Deserialize, Serialize};

use crate::shared::constants::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};

/// Business primary key
pub type BusinessId = i32;

/// Filing primary key
pub type FilingId = i32;

/// User primary key
pub type UserId = i32;

/// Invitation primary key
pub type InvitationId = i32;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaginationParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PaginationParams {
    /// Builds parameters from optional query values, clamped to sane bounds
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE),
            limit: limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    /// Row offset
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }
}

/// One page of results, serialized as `{page, limit, items, total}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub limit: u32,
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(params: PaginationParams, items: Vec<T>, total: i64) -> Self {
        Self {
            page: params.page,
            limit: params.limit,
            items,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::from_query(None, None);
        assert_eq!(params, PaginationParams { page: 1, limit: 50 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_offset_and_clamp() {
        let params = PaginationParams::from_query(Some(3), Some(10));
        assert_eq!(params.offset(), 20);

        let params = PaginationParams::from_query(Some(0), Some(100_000));
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, MAX_LIMIT);
    }
}
