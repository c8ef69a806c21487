//! Builder error types.
//!
//! Every failure in this crate is a construction-time error raised at the
//! offending call site; serialisation itself never fails. The staged query
//! builder rules out a further class of mistakes (double-set clauses, locks
//! after set operations) at compile time, so those have no runtime variant.

use thiserror::Error;

/// Result type for fallible builder operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while constructing queries or expressions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Operator string is neither whitelisted nor safely symbolic.
    #[error("invalid operator {op:?}: not whitelisted and not a safe symbolic operator")]
    InvalidOperator {
        /// The rejected operator text.
        op: String,
    },

    /// UUID literal does not conform to the 8-4-4-4-12 hex layout.
    #[error("invalid uuid literal {value:?}")]
    InvalidUuid {
        /// The rejected literal.
        value: String,
    },

    /// Argumentless aggregate combined with `DISTINCT` or `ORDER BY`.
    #[error("invalid aggregate configuration: {reason}")]
    InvalidAggregateConfiguration {
        /// What the caller attempted.
        reason: String,
    },

    /// `FETCH` specified without a preceding `OFFSET`.
    #[error("FETCH requires an OFFSET clause")]
    MissingOffsetForFetch,

    /// `.scalar()` called on a subquery that is not exactly one column wide.
    #[error("scalar subquery must select exactly one column, found {found}")]
    ScalarArity {
        /// Number of columns in the offending projection.
        found: usize,
    },

    /// Two `window(name, ..)` calls with the same name in one query.
    #[error("duplicate window name {name:?}")]
    DuplicateWindowName {
        /// The name declared twice.
        name: String,
    },
}
