//! Error types for input validation.
//!
//! Solver trouble is never an error: it is reported through
//! [`OptimizationResult::warning`](crate::OptimizationResult::warning).
//! The variants here cover malformed inputs rejected at construction time.

#[cfg(feature = "config")]
use std::path::PathBuf;

/// All errors returned by fallible constructors.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("returns matrix has no dates")]
    NoDates,

    #[error("returns matrix has no assets")]
    NoAssets,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{rows} rows for {dates} dates")]
    RowCount { dates: usize, rows: usize },

    #[error("column {asset} has {found} values, expected {expected}")]
    ColumnLength {
        asset: String,
        expected: usize,
        found: usize,
    },

    #[error("dates must be strictly increasing: {prev} is followed by {next}")]
    UnorderedDates {
        prev: chrono::NaiveDate,
        next: chrono::NaiveDate,
    },

    #[error("non-finite return for {asset} on {date}")]
    NonFiniteReturn {
        asset: String,
        date: chrono::NaiveDate,
    },

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("weights must have a positive finite sum, got {0}")]
    NonPositiveWeights(f64),

    #[error("need at least {required} dates, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid bounds for {asset}: min {min} > max {max} or not finite")]
    InvalidBounds { asset: String, min: f64, max: f64 },

    #[error("moments mismatch: {0}")]
    Moments(String),

    #[error("invalid rebalance frequency: {0:?}")]
    InvalidFrequency(String),

    #[error("sampler error: {0}")]
    Sampler(String),

    #[cfg(feature = "config")]
    #[error("config error: {0}")]
    Config(String),

    #[cfg(feature = "config")]
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[cfg(feature = "config")]
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AllocError>;
