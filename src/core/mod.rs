//! Core data structures for monthly streamflow forecasting.

mod forecast;
mod monthly_series;

pub use forecast::{Forecast, IntervalBand};
pub use monthly_series::MonthlySeries;
