//! Triple exponential smoothing with an additive annual season.

use crate::core::{Forecast, IntervalBand, MonthlySeries};
use crate::error::{FlowError, Result};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::quantile_normal;

const PERIOD: usize = 12;

/// Minimum history: two full annual cycles.
pub const MIN_HISTORY: usize = 2 * PERIOD;

/// Holt-Winters smoothing with an additive monthly season.
///
/// State equations:
/// - Level: `l_t = α(y_t - s_{t-12}) + (1-α)(l_{t-1} + b_{t-1})`
/// - Trend: `b_t = β(l_t - l_{t-1}) + (1-β)b_{t-1}`
/// - Seasonal: `s_t = γ(y_t - l_t) + (1-γ)s_{t-12}`
/// - Forecast: `ŷ_{t+h} = l_t + h·b_t + s_{t+h-12}`
#[derive(Debug, Clone)]
pub struct SeasonalSmoothing {
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
    optimize: bool,
    level: Option<f64>,
    trend: Option<f64>,
    seasonals: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    aic: Option<f64>,
    n: usize,
}

impl SeasonalSmoothing {
    /// Model with parameters chosen by in-sample SSE minimization.
    pub fn new() -> Self {
        Self {
            alpha: None,
            beta: None,
            gamma: None,
            optimize: true,
            level: None,
            trend: None,
            seasonals: None,
            fitted: None,
            residuals: None,
            residual_variance: None,
            aic: None,
            n: 0,
        }
    }

    /// Model with fixed smoothing parameters.
    pub fn with_params(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha: Some(alpha.clamp(1e-4, 1.0 - 1e-4)),
            beta: Some(beta.clamp(1e-4, 1.0 - 1e-4)),
            gamma: Some(gamma.clamp(1e-4, 1.0 - 1e-4)),
            optimize: false,
            ..Self::new()
        }
    }

    /// Level smoothing parameter.
    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    /// Trend smoothing parameter.
    pub fn beta(&self) -> Option<f64> {
        self.beta
    }

    /// Seasonal smoothing parameter.
    pub fn gamma(&self) -> Option<f64> {
        self.gamma
    }

    /// Seasonal indices in the state after fitting, indexed by `t % 12`.
    pub fn seasonals(&self) -> Option<&[f64]> {
        self.seasonals.as_deref()
    }

    /// Level at first year's mean; trend from the year-over-year change;
    /// seasonal indices from first-year deviations, normalized to sum zero.
    fn initialize_state(values: &[f64]) -> (f64, f64, Vec<f64>) {
        let level = values[..PERIOD].iter().sum::<f64>() / PERIOD as f64;
        let trend = if values.len() >= 2 * PERIOD {
            (0..PERIOD)
                .map(|i| (values[PERIOD + i] - values[i]) / PERIOD as f64)
                .sum::<f64>()
                / PERIOD as f64
        } else {
            0.0
        };
        let mut seasonals: Vec<f64> = values[..PERIOD].iter().map(|y| y - level).collect();
        let mean = seasonals.iter().sum::<f64>() / PERIOD as f64;
        for s in seasonals.iter_mut() {
            *s -= mean;
        }
        (level, trend, seasonals)
    }

    /// One-step-ahead sum of squared errors for candidate parameters.
    fn sse(values: &[f64], alpha: f64, beta: f64, gamma: f64) -> f64 {
        let (mut level, mut trend, mut seasonals) = Self::initialize_state(values);
        let mut sse = 0.0;
        for (t, &y) in values.iter().enumerate().skip(PERIOD) {
            let idx = t % PERIOD;
            let s = seasonals[idx];
            let pred = level + trend + s;
            let error = y - pred;
            sse += error * error;

            let level_prev = level;
            level = alpha * (y - s) + (1.0 - alpha) * (level_prev + trend);
            trend = beta * (level - level_prev) + (1.0 - beta) * trend;
            seasonals[idx] = gamma * (y - level) + (1.0 - gamma) * s;
        }
        sse
    }

    fn optimize_params(values: &[f64]) -> (f64, f64, f64) {
        let config = NelderMeadConfig {
            max_iter: 1000,
            tolerance: 1e-8,
            ..Default::default()
        };
        let bounds = [(1e-4, 1.0 - 1e-4); 3];
        let result = nelder_mead(
            |p| Self::sse(values, p[0], p[1], p[2]),
            &[0.3, 0.1, 0.1],
            Some(&bounds[..]),
            config,
        );
        (
            result.optimal_point[0].clamp(1e-4, 1.0 - 1e-4),
            result.optimal_point[1].clamp(1e-4, 1.0 - 1e-4),
            result.optimal_point[2].clamp(1e-4, 1.0 - 1e-4),
        )
    }
}

impl Default for SeasonalSmoothing {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for SeasonalSmoothing {
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

        if self.optimize {
            let (alpha, beta, gamma) = Self::optimize_params(values);
            self.alpha = Some(alpha);
            self.beta = Some(beta);
            self.gamma = Some(gamma);
        }
        let alpha = self.alpha.ok_or(FlowError::FitRequired)?;
        let beta = self.beta.ok_or(FlowError::FitRequired)?;
        let gamma = self.gamma.ok_or(FlowError::FitRequired)?;

        let (mut level, mut trend, mut seasonals) = Self::initialize_state(values);
        let mut fitted = vec![f64::NAN; PERIOD];
        let mut residuals = vec![0.0; PERIOD];

        for (t, &y) in values.iter().enumerate().skip(PERIOD) {
            let idx = t % PERIOD;
            let s = seasonals[idx];
            let pred = level + trend + s;
            fitted.push(pred);
            residuals.push(y - pred);

            let level_prev = level;
            level = alpha * (y - s) + (1.0 - alpha) * (level_prev + trend);
            trend = beta * (level - level_prev) + (1.0 - beta) * trend;
            seasonals[idx] = gamma * (y - level) + (1.0 - gamma) * s;
        }

        let valid = &residuals[PERIOD..];
        let variance = valid.iter().map(|r| r * r).sum::<f64>() / valid.len() as f64;
        if !variance.is_finite() {
            return Err(FlowError::FitFailure(
                "smoothing recursion diverged".to_string(),
            ));
        }
        self.residual_variance = Some(variance);

        // Gaussian likelihood from the one-step errors; three smoothing
        // parameters estimated.
        let n_eff = valid.len() as f64;
        let ll = -0.5
            * n_eff
            * (1.0 + variance.max(f64::MIN_POSITIVE).ln() + (2.0 * std::f64::consts::PI).ln());
        self.aic = Some(-2.0 * ll + 2.0 * 3.0);

        self.level = Some(level);
        self.trend = Some(trend);
        self.seasonals = Some(seasonals);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(FlowError::FitRequired)?;
        let trend = self.trend.ok_or(FlowError::FitRequired)?;
        let seasonals = self.seasonals.as_ref().ok_or(FlowError::FitRequired)?;

        let predictions: Vec<f64> = (1..=horizon)
            .map(|h| {
                let s = seasonals[(self.n + h - 1) % PERIOD];
                level + h as f64 * trend + s
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

    fn aic(&self) -> Option<f64> {
        self.aic
    }

    fn name(&self) -> &str {
        "SeasonalSmoothing"
    }
}
