//! Forecaster trait defining the common interface for all models.

use crate::core::{Forecast, MonthlySeries};
use crate::error::Result;

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the monthly series.
    fn fit(&mut self, series: &MonthlySeries) -> Result<()>;

    /// Generate predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Generate predictions with confidence intervals at the given levels
    /// (e.g. `&[0.80, 0.95]`).
    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        // Default implementation just returns point predictions
        let _ = levels;
        self.predict(horizon)
    }

    /// Get the fitted values (in-sample predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Akaike information criterion of the fitted model, where defined.
    fn aic(&self) -> Option<f64> {
        None
    }

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster + Send>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::Arima;
    use crate::models::ModelFamily;

    fn make_test_series(n: usize) -> MonthlySeries {
        let values: Vec<f64> = (0..n)
            .map(|i| 50.0 + 10.0 * ((i % 12) as f64) + 0.1 * i as f64)
            .collect();
        MonthlySeries::new(values, 2015, 1).unwrap()
    }

    #[test]
    fn test_boxed_forecaster() {
        let model: BoxedForecaster = Box::new(Arima::new(1, 0, 0));
        assert_eq!(model.name(), "ARIMA");
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_boxed_forecaster_fit_predict() {
        let mut model: BoxedForecaster = Box::new(Arima::new(1, 1, 0));
        let series = make_test_series(48);

        assert!(model.fit(&series).is_ok());
        assert!(model.is_fitted());

        let forecast = model.predict(6).unwrap();
        assert_eq!(forecast.horizon(), 6);
    }

    #[test]
    fn test_forecaster_trait_methods() {
        let mut model = Arima::new(1, 0, 1);
        let series = make_test_series(48);

        // Before fit
        assert!(!model.is_fitted());
        assert!(model.fitted_values().is_none());
        assert!(model.residuals().is_none());

        // After fit
        model.fit(&series).unwrap();
        assert!(model.is_fitted());
        assert!(model.fitted_values().is_some());
        assert!(model.residuals().is_some());
        assert!(model.aic().is_some());
    }

    #[test]
    fn test_family_builds_boxed_models() {
        let models: Vec<BoxedForecaster> = ModelFamily::candidates()
            .iter()
            .map(|f| f.build())
            .collect();
        assert_eq!(models.len(), 5);
        for model in &models {
            assert!(!model.is_fitted());
        }
    }
}
