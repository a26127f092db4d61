//! Forecasting models for monthly streamflow.

pub mod arima;
pub mod decomposition;
pub mod ensemble;
pub mod exponential;
pub mod traits;

pub use arima::{Arima, ArimaSpec, AutoArima, AutoArimaConfig};
pub use decomposition::DecompositionAr;
pub use ensemble::{Ensemble, WeightMethod};
pub use exponential::SeasonalSmoothing;
pub use traits::{BoxedForecaster, Forecaster};

/// The model families the evaluation layer can build and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Non-seasonal ARIMA with automatic order selection.
    Arima,
    /// ARIMA with seasonal terms at the annual lag.
    SeasonalArima,
    /// Holt-Winters smoothing with an additive monthly season.
    ExponentialSmoothing,
    /// Classical decomposition with an AR remainder.
    Decomposition,
    /// Weighted combination of the other families.
    Ensemble,
}

impl ModelFamily {
    /// Every family, in comparison order.
    pub fn candidates() -> &'static [ModelFamily] {
        &[
            ModelFamily::Arima,
            ModelFamily::SeasonalArima,
            ModelFamily::ExponentialSmoothing,
            ModelFamily::Decomposition,
            ModelFamily::Ensemble,
        ]
    }

    /// Construct an unfitted model of this family.
    pub fn build(&self) -> BoxedForecaster {
        match self {
            ModelFamily::Arima => Box::new(AutoArima::new()),
            ModelFamily::SeasonalArima => Box::new(AutoArima::seasonal()),
            ModelFamily::ExponentialSmoothing => Box::new(SeasonalSmoothing::new()),
            ModelFamily::Decomposition => Box::new(DecompositionAr::new()),
            ModelFamily::Ensemble => Box::new(Ensemble::with_default_members()),
        }
    }

    /// Shortest training series the family accepts.
    pub fn min_history(&self) -> usize {
        match self {
            ModelFamily::Arima | ModelFamily::SeasonalArima => arima::MIN_HISTORY,
            ModelFamily::ExponentialSmoothing => exponential::MIN_HISTORY,
            ModelFamily::Decomposition => decomposition::MIN_HISTORY,
            ModelFamily::Ensemble => ensemble::MIN_HISTORY,
        }
    }

    /// Stable display label.
    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::Arima => "AutoARIMA",
            ModelFamily::SeasonalArima => "SeasonalARIMA",
            ModelFamily::ExponentialSmoothing => "SeasonalSmoothing",
            ModelFamily::Decomposition => "DecompositionAR",
            ModelFamily::Ensemble => "Ensemble",
        }
    }
}
