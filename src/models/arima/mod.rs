//! ARIMA models: fixed-order and automatic selection.

pub mod auto;
pub mod diff;
pub mod model;

pub use auto::{AutoArima, AutoArimaConfig};
pub use model::{Arima, ArimaSpec, MIN_HISTORY, SEASONAL_PERIOD};
