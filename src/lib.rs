//! # flowcast
//!
//! Monthly streamflow forecasting for hydrological stations.
//!
//! Provides per-calendar-month statistics, flow-duration-curve scenario
//! forecasts with persistence adjustment, time-series models (ARIMA,
//! seasonal smoothing, decomposition, ensembles), and model evaluation via
//! holdout comparison and walk-forward cross-validation.

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod flow_duration;
pub mod models;
pub mod monthly;
pub mod utils;

pub use error::{FlowError, Result};

pub mod prelude {
    pub use crate::config::ForecastOptions;
    pub use crate::core::{Forecast, IntervalBand, MonthlySeries};
    pub use crate::error::{FlowError, Result};
    pub use crate::evaluation::{compare_all, cross_validate, CvConfig};
    pub use crate::flow_duration::{FlowDurationForecaster, ScenarioForecast};
    pub use crate::models::{Forecaster, ModelFamily};
    pub use crate::monthly::monthly_stats;
    pub use crate::utils::{evaluate, EvalMetrics};
}
