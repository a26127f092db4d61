//! Seasonal decomposition with an autoregressive remainder model.

use crate::core::{Forecast, IntervalBand, MonthlySeries};
use crate::error::{FlowError, Result};
use crate::models::arima::Arima;
use crate::models::Forecaster;
use crate::utils::stats::quantile_normal;

const PERIOD: usize = 12;

/// Minimum history: three full annual cycles, so the centered moving
/// average leaves enough detrended values in every month.
pub const MIN_HISTORY: usize = 3 * PERIOD;

const MAX_AR_ORDER: usize = 3;

/// Classical additive decomposition followed by an AR model.
///
/// The series splits into a centered-moving-average trend, mean monthly
/// seasonal indices, and a remainder; the seasonally adjusted series
/// (observed minus seasonal) is then modeled with an AR(p) whose order is
/// picked by AIC. Forecasts add the seasonal index back onto the AR path.
#[derive(Debug, Clone, Default)]
pub struct DecompositionAr {
    /// Seasonal index per position-in-year (`t % 12` on the input axis).
    seasonals: Option<Vec<f64>>,
    ar: Option<Arima>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    n: usize,
}

impl DecompositionAr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order of the chosen remainder AR model.
    pub fn ar_order(&self) -> Option<usize> {
        self.ar.as_ref().map(|m| m.spec().p)
    }

    /// Seasonal indices, indexed by `t % 12` on the input axis.
    pub fn seasonals(&self) -> Option<&[f64]> {
        self.seasonals.as_deref()
    }

    /// Centered 2x12 moving-average trend; NaN where the window does not
    /// fit.
    fn trend(values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let half = PERIOD / 2;
        let mut trend = vec![f64::NAN; n];
        for t in half..n.saturating_sub(half) {
            // Even period: half weight on the two outermost observations.
            let mut sum = 0.5 * (values[t - half] + values[t + half]);
            for k in (t - half + 1)..(t + half) {
                sum += values[k];
            }
            trend[t] = sum / PERIOD as f64;
        }
        trend
    }

    /// Mean detrended value per position-in-year, normalized to sum zero.
    fn seasonal_indices(values: &[f64], trend: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0; PERIOD];
        let mut counts = vec![0usize; PERIOD];
        for (t, (&y, &tr)) in values.iter().zip(trend.iter()).enumerate() {
            if tr.is_finite() {
                sums[t % PERIOD] += y - tr;
                counts[t % PERIOD] += 1;
            }
        }
        let mut seasonals: Vec<f64> = sums
            .iter()
            .zip(counts.iter())
            .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect();
        let mean = seasonals.iter().sum::<f64>() / PERIOD as f64;
        for s in seasonals.iter_mut() {
            *s -= mean;
        }
        seasonals
    }
}

impl Forecaster for DecompositionAr {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        if series.has_missing() {
            return Err(FlowError::MissingValues);
        }
        let values = series.values();
        if values.len() < MIN_HISTORY {
            return Err(FlowError::InsufficientHistory {
                needed: MIN_HISTORY,
                got: values.len(),
            });
        }
        self.n = values.len();

        let trend = Self::trend(values);
        let seasonals = Self::seasonal_indices(values, &trend);
        let adjusted: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(t, &y)| y - seasonals[t % PERIOD])
            .collect();
        let adjusted_series =
            MonthlySeries::new(adjusted, series.start_year(), series.start_month())?;

        // Remainder order by AIC over a small AR grid.
        let mut best: Option<Arima> = None;
        for p in 1..=MAX_AR_ORDER {
            let mut candidate = Arima::new(p, 0, 0);
            if candidate.fit(&adjusted_series).is_err() {
                continue;
            }
            let better = match (&best, candidate.aic()) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(b), Some(aic)) => b.aic().map_or(true, |b_aic| aic < b_aic),
            };
            if better {
                best = Some(candidate);
            }
        }
        let ar = best.ok_or_else(|| {
            FlowError::FitFailure("no AR order fit the seasonally adjusted series".to_string())
        })?;

        // Fitted values on the observed scale: AR fit plus seasonal index.
        let ar_fitted = ar.fitted_values().ok_or(FlowError::FitRequired)?;
        let fitted: Vec<f64> = ar_fitted
            .iter()
            .enumerate()
            .map(|(t, &f)| f + seasonals[t % PERIOD])
            .collect();
        let residuals: Vec<f64> = values
            .iter()
            .zip(fitted.iter())
            .map(|(&y, &f)| if f.is_finite() { y - f } else { 0.0 })
            .collect();
        let valid: Vec<f64> = residuals
            .iter()
            .zip(fitted.iter())
            .filter(|(_, f)| f.is_finite())
            .map(|(&r, _)| r)
            .collect();
        if valid.is_empty() {
            return Err(FlowError::FitFailure(
                "remainder model left no residuals".to_string(),
            ));
        }
        self.residual_variance =
            Some(valid.iter().map(|r| r * r).sum::<f64>() / valid.len() as f64);

        self.seasonals = Some(seasonals);
        self.ar = Some(ar);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let ar = self.ar.as_ref().ok_or(FlowError::FitRequired)?;
        let seasonals = self.seasonals.as_ref().ok_or(FlowError::FitRequired)?;

        let base = ar.predict(horizon)?;
        let predictions: Vec<f64> = base
            .point()
            .iter()
            .enumerate()
            .map(|(i, &v)| v + seasonals[(self.n + i) % PERIOD])
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
        "DecompositionAR"
    }
}
