//! Error types for coupon pool construction.
use thiserror::Error;

/// Errors raised while building or loading a coupon pool.
///
/// Allocation and claiming never fail with an error; rate limiting and an
/// empty pool are ordinary [`ClaimOutcome`](crate::types::ClaimOutcome)s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("coupon pool is empty")] EmptyPool,
    #[error("duplicate coupon id: {0}")] DuplicateId(String),
    #[error("empty coupon field `{field}` on coupon {index}")] EmptyField { field: &'static str, index: usize },
    #[error("invalid pool definition: {0}")] InvalidPool(String),
}
