//! Error taxonomy shared by every verb in the crate.
//!
//! All variants carry the offending identifier so callers can decide which
//! column, feature or assay to pick instead. Operations are deterministic, so
//! none of these errors is worth retrying without changing the input.

use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TidyError {
    /// A verb referenced a column that is neither stored metadata nor a
    /// computed embedding coordinate.
    #[error("column not found: '{0}'")]
    ColumnNotFound(String),

    #[error("assay not found: '{0}'")]
    AssayNotFound(String),

    #[error("feature not found: '{feature}' (assay '{assay}')")]
    FeatureNotFound { feature: String, assay: String },

    #[error("feature requested more than once: '{0}'")]
    DuplicateFeature(String),

    #[error("duplicate cell id: '{0}'")]
    DuplicateCellId(String),

    /// Two sides of an operation disagree on a count (rows, columns,
    /// capture groups, assay sets).
    #[error("cardinality mismatch in '{context}': expected {expected}, found {found}")]
    CardinalityMismatch {
        context:  String,
        expected: String,
        found:    String,
    },

    #[error("value '{value}' in column '{column}' does not match pattern '{pattern}'")]
    PatternMismatch {
        column:  String,
        value:   String,
        pattern: String,
    },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// `cell_id` can not be dropped, overwritten or renamed.
    #[error("column '{0}' is protected")]
    ProtectedColumn(String),

    #[error("column '{column}' row {row} holds {found}, expected a dataset")]
    PayloadMismatch {
        column: String,
        row:    usize,
        found:  String,
    },

    /// A builder check failed while assembling a dataset.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TidyError {
    pub(crate) fn cardinality(
        context: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        TidyError::CardinalityMismatch {
            context:  context.into(),
            expected: expected.to_string(),
            found:    found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TidyError>;
