//! Ensemble forecaster combining the individual model families.

use crate::core::{Forecast, IntervalBand, MonthlySeries};
use crate::error::{FlowError, Result};
use crate::models::arima::Arima;
use crate::models::decomposition::DecompositionAr;
use crate::models::exponential::SeasonalSmoothing;
use crate::models::{BoxedForecaster, Forecaster};
use crate::utils::stats::quantile_normal;

/// Minimum history: four full years, enough for every default member.
pub const MIN_HISTORY: usize = 48;

/// How member forecasts are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightMethod {
    /// Equal weight per fitted member.
    #[default]
    Equal,
    /// Weight proportional to the inverse in-sample RMSE.
    InverseRmse,
}

/// Weighted combination of several forecasting models.
///
/// A member that fails to fit is dropped with a warning rather than failing
/// the ensemble; only when every member fails does `fit` error. Weights are
/// normalized over the surviving members and always sum to one.
pub struct Ensemble {
    members: Vec<BoxedForecaster>,
    method: WeightMethod,
    /// Per-member weight after fitting; zero for dropped members.
    weights: Vec<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    is_fitted: bool,
}

impl Ensemble {
    /// Ensemble over explicit members.
    pub fn new(members: Vec<BoxedForecaster>) -> Self {
        let n = members.len();
        Self {
            members,
            method: WeightMethod::default(),
            weights: vec![0.0; n],
            fitted: None,
            residuals: None,
            residual_variance: None,
            is_fitted: false,
        }
    }

    /// The default member set: seasonal ARIMA, Holt-Winters smoothing, and
    /// decomposition-plus-AR.
    pub fn with_default_members() -> Self {
        Self::new(vec![
            Box::new(Arima::seasonal(1, 0, 0, 0, 1, 0)),
            Box::new(SeasonalSmoothing::new()),
            Box::new(DecompositionAr::new()),
        ])
    }

    /// Choose the combination method.
    pub fn with_method(mut self, method: WeightMethod) -> Self {
        self.method = method;
        self
    }

    /// Per-member weights after fitting. Dropped members carry zero.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Member names paired with their weights.
    pub fn member_weights(&self) -> Vec<(&str, f64)> {
        self.members
            .iter()
            .zip(self.weights.iter())
            .map(|(m, &w)| (m.name(), w))
            .collect()
    }

    /// Number of members, fitted or not.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    fn in_sample_rmse(model: &BoxedForecaster, actual: &[f64]) -> Option<f64> {
        let fitted = model.fitted_values()?;
        let mut sum = 0.0;
        let mut count = 0usize;
        for (&a, &f) in actual.iter().zip(fitted.iter()) {
            if a.is_finite() && f.is_finite() {
                sum += (a - f).powi(2);
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some((sum / count as f64).sqrt())
        }
    }

    fn compute_weights(&mut self, actual: &[f64], active: &[bool]) {
        let n = self.members.len();
        let mut raw = vec![0.0; n];
        match self.method {
            WeightMethod::Equal => {
                for (w, &a) in raw.iter_mut().zip(active.iter()) {
                    if a {
                        *w = 1.0;
                    }
                }
            }
            WeightMethod::InverseRmse => {
                for (i, (model, &a)) in self.members.iter().zip(active.iter()).enumerate() {
                    if a {
                        let rmse = Self::in_sample_rmse(model, actual)
                            .unwrap_or(f64::INFINITY)
                            .max(1e-10);
                        raw[i] = 1.0 / rmse;
                    }
                }
            }
        }
        let sum: f64 = raw.iter().sum();
        self.weights = if sum > 0.0 && sum.is_finite() {
            raw.iter().map(|w| w / sum).collect()
        } else {
            let count = active.iter().filter(|a| **a).count().max(1);
            active
                .iter()
                .map(|&a| if a { 1.0 / count as f64 } else { 0.0 })
                .collect()
        };
    }

    /// Weighted combination at one step, renormalizing over the members
    /// that produced a finite value.
    fn combine_step(weights: &[f64], values: &[Option<f64>]) -> f64 {
        let mut sum = 0.0;
        let mut weight_sum = 0.0;
        for (&w, v) in weights.iter().zip(values.iter()) {
            if let Some(v) = v {
                if v.is_finite() && w > 0.0 {
                    sum += w * v;
                    weight_sum += w;
                }
            }
        }
        if weight_sum > 0.0 {
            sum / weight_sum
        } else {
            f64::NAN
        }
    }
}

impl Forecaster for Ensemble {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        if self.members.is_empty() {
            return Err(FlowError::InvalidParameter(
                "ensemble has no members".to_string(),
            ));
        }
        if series.has_missing() {
            return Err(FlowError::MissingValues);
        }
        if series.len() < MIN_HISTORY {
            return Err(FlowError::InsufficientHistory {
                needed: MIN_HISTORY,
                got: series.len(),
            });
        }

        let mut active = vec![false; self.members.len()];
        for (i, model) in self.members.iter_mut().enumerate() {
            match model.fit(series) {
                Ok(()) => active[i] = true,
                Err(err) => {
                    log::warn!("ensemble member {} dropped: {err}", model.name());
                }
            }
        }
        if active.iter().all(|a| !a) {
            return Err(FlowError::FitFailure(
                "every ensemble member failed to fit".to_string(),
            ));
        }

        let values = series.values();
        self.compute_weights(values, &active);

        let n = values.len();
        let mut fitted = Vec::with_capacity(n);
        for t in 0..n {
            let step: Vec<Option<f64>> = self
                .members
                .iter()
                .zip(active.iter())
                .map(|(m, &a)| {
                    if a {
                        m.fitted_values().and_then(|f| f.get(t).copied())
                    } else {
                        None
                    }
                })
                .collect();
            fitted.push(Self::combine_step(&self.weights, &step));
        }
        let residuals: Vec<f64> = values
            .iter()
            .zip(fitted.iter())
            .map(|(&y, &f)| y - f)
            .collect();

        let valid: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
        if !valid.is_empty() {
            self.residual_variance =
                Some(valid.iter().map(|r| r * r).sum::<f64>() / valid.len() as f64);
        }

        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        if !self.is_fitted {
            return Err(FlowError::FitRequired);
        }

        let mut member_forecasts: Vec<Option<Vec<f64>>> = Vec::with_capacity(self.members.len());
        for (model, &w) in self.members.iter().zip(self.weights.iter()) {
            if w <= 0.0 {
                member_forecasts.push(None);
                continue;
            }
            match model.predict(horizon) {
                Ok(fc) => member_forecasts.push(Some(fc.point().to_vec())),
                Err(err) => {
                    log::warn!("ensemble member {} failed to predict: {err}", model.name());
                    member_forecasts.push(None);
                }
            }
        }
        if member_forecasts.iter().all(Option::is_none) {
            return Err(FlowError::FitFailure(
                "no ensemble member produced a forecast".to_string(),
            ));
        }

        let predictions: Vec<f64> = (0..horizon)
            .map(|h| {
                let step: Vec<Option<f64>> = member_forecasts
                    .iter()
                    .map(|f| f.as_ref().map(|v| v[h]))
                    .collect();
                Self::combine_step(&self.weights, &step)
            })
            .collect();
        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        let mut forecast = self.predict(horizon)?;
        let variance = self.residual_variance.unwrap_or(0.0);
        let preds = forecast.point().to_vec();

        for &level in levels {
            if !(0.0..1.0).contains(&level) {
                return Err(FlowError::InvalidParameter(format!(
                    "confidence level {level} outside [0, 1)"
                )));
            }
            let z = quantile_normal((1.0 + level) / 2.0);
            let mut lower = Vec::with_capacity(horizon);
            let mut upper = Vec::with_capacity(horizon);
            for h in 1..=horizon {
                let se = (variance * h as f64).sqrt();
                lower.push(preds[h - 1] - z * se);
                upper.push(preds[h - 1] + z * se);
            }
            forecast.push_band(IntervalBand::new(level, lower, upper));
        }
        Ok(forecast)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "Ensemble"
    }
}
