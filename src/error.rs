//! Error types for index mutations and configuration parsing.

use thiserror::Error;

/// Errors reported by [`PrefixIndex`](crate::PrefixIndex) operations.
///
/// Every error is raised before the tree is touched, so a rejected call leaves
/// the index exactly as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The weight passed to `insert` was zero, negative, not finite, or would
    /// push the aggregate weight of the index past the largest finite `f64`.
    #[error("weight must be a positive finite number with a finite total, got {0}")]
    InvalidWeight(f64),

    /// The value is already stored under a different prefix.
    ///
    /// A value is filed under exactly one prefix; repeated inserts must reuse
    /// the original prefix so that weight accumulates on the same leaf.
    #[error("value is already stored under a different prefix")]
    PrefixMismatch,

    /// An aggregation mode name was not recognised.
    #[error("unknown aggregation mode `{0}` (expected `sum` or `average`)")]
    UnknownAggregation(String),
}

/// A specialized `Result` type for index operations.
pub type Result<T> = std::result::Result<T, Error>;
