//! Shared utilities: statistics, metrics, optimization.

pub mod metrics;
pub mod optimization;
pub mod stats;

pub use metrics::{evaluate, EvalMetrics};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{empirical_cdf, quantile, quantile_normal};
