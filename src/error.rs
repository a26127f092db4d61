//! Error types for the flowcast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur during forecasting and evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Input series contains no observations.
    #[error("empty input series")]
    EmptySeries,

    /// The series is not a valid fixed-period monthly series.
    #[error("invalid monthly series: {0}")]
    InvalidSeries(String),

    /// Series shorter than the operation's minimum history.
    #[error("insufficient history: need at least {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// A calendar month has too few observations for the requested statistic.
    #[error("insufficient data for month {month}: {count} observations (minimum {needed})")]
    InsufficientMonthData {
        month: u32,
        count: usize,
        needed: usize,
    },

    /// Paired argument lengths disagree (e.g. percentiles vs labels).
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing values present where the operation cannot tolerate them.
    #[error("missing values in training data")]
    MissingValues,

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// A model family failed to converge or fit.
    #[error("model fit failed: {0}")]
    FitFailure(String),

    /// Numerical failure during computation.
    #[error("computation error: {0}")]
    ComputationError(String),
}
