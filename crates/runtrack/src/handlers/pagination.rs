//! Pagination helpers and types.

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;

/// Default pagination limit.
pub const DEFAULT_LIMIT: i64 = 50;

/// Returns the default pagination limit.
pub fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Reject negative paging values before they reach a LIMIT/OFFSET clause.
pub fn validate_page(limit: i64, offset: i64) -> Result<(), AppError> {
    if limit < 0 || offset < 0 {
        return Err(AppError::Validation(
            "limit and offset must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Paginated response wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total_count: i64, limit: i64, offset: i64) -> Self {
        Self {
            items,
            total_count,
            limit,
            offset,
        }
    }
}
