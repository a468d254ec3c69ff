//! Query IR error types.

use thiserror::Error;

/// Errors raised while assembling a select query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The first record to load was negative.
    #[error("FirstRecordToLoad should not be negative (got {0})")]
    NegativeFirstRecord(i64),

    /// Order criteria were set before the query had a source to join against.
    #[error("the source of a select query must be set before its order criteria")]
    OrderCriteriaWithoutSource,
}
