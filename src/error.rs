//! Error types for dataset loading and technique execution.

use thiserror::Error;

/// Failure raised while reading a dataset source into a [`DataFrame`].
///
/// [`DataFrame`]: crate::table::DataFrame
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON dataset must be an array of records")]
    NotRecords,

    #[error("dataset has no columns")]
    Empty,
}

/// Failure returned by a technique's `run`.
///
/// Every technique reports failures through this enum instead of panicking;
/// the pipeline folds the variant into an error envelope.
#[derive(Error, Debug)]
pub enum TechniqueError {
    #[error("At least {required} numeric columns required")]
    NotEnoughNumericColumns { required: usize },

    #[error("At least 1 numeric column required")]
    NoNumericColumns,

    #[error("No numeric data available for clustering")]
    NoNumericData,

    #[error("no rows remaining after dropping missing values")]
    EmptySelection,

    #[error("invalid value for `{name}`: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("{0}")]
    Computation(String),
}

impl TechniqueError {
    /// Shorthand for the catch-all numeric-failure variant.
    pub fn computation(msg: impl Into<String>) -> Self {
        TechniqueError::Computation(msg.into())
    }
}
