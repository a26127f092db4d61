//! ARIMA model with optional seasonal terms at the annual lag.

use crate::core::{Forecast, IntervalBand, MonthlySeries};
use crate::error::{FlowError, Result};
use crate::models::arima::diff::{difference, integrate, integrate_seasonal, seasonal_difference};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::quantile_normal;

/// Seasonal period for monthly data.
pub const SEASONAL_PERIOD: usize = 12;

/// Minimum history for a non-seasonal fit: two full years.
pub const MIN_HISTORY: usize = 24;

/// ARIMA order specification. The seasonal part, when present, operates at
/// the annual lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaSpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Seasonal AR order (P)
    pub sp: usize,
    /// Seasonal differencing order (D), at most 1
    pub sd: usize,
    /// Seasonal MA order (Q)
    pub sq: usize,
}

impl ArimaSpec {
    /// Non-seasonal specification.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            sp: 0,
            sd: 0,
            sq: 0,
        }
    }

    /// Specification with seasonal orders at the annual lag.
    pub fn seasonal(p: usize, d: usize, q: usize, sp: usize, sd: usize, sq: usize) -> Self {
        Self { p, d, q, sp, sd, sq }
    }

    /// True when any seasonal order is non-zero.
    pub fn is_seasonal(&self) -> bool {
        self.sp > 0 || self.sd > 0 || self.sq > 0
    }

    /// Number of estimated parameters: AR + MA + seasonal AR + seasonal MA
    /// + intercept.
    pub fn num_params(&self) -> usize {
        self.p + self.q + self.sp + self.sq + 1
    }

    /// Longest backward lag the recursion reaches.
    fn max_lag(&self) -> usize {
        (self.p + self.sp * SEASONAL_PERIOD).max(self.q + self.sq * SEASONAL_PERIOD)
    }
}

impl Default for ArimaSpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// ARIMA forecasting model fitted by conditional least squares.
#[derive(Debug, Clone)]
pub struct Arima {
    spec: ArimaSpec,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sar: Vec<f64>,
    sma: Vec<f64>,
    intercept: f64,
    /// Original series, for integration.
    original: Option<Vec<f64>>,
    /// Series after seasonal differencing only.
    seasonal_adjusted: Option<Vec<f64>>,
    /// Fully differenced working series.
    working: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    aic: Option<f64>,
    bic: Option<f64>,
}

impl Arima {
    /// Non-seasonal ARIMA(p, d, q).
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::with_spec(ArimaSpec::new(p, d, q))
    }

    /// Seasonal ARIMA(p, d, q)(P, D, Q) at the annual lag.
    pub fn seasonal(p: usize, d: usize, q: usize, sp: usize, sd: usize, sq: usize) -> Self {
        Self::with_spec(ArimaSpec::seasonal(p, d, q, sp, sd, sq))
    }

    /// Model from an explicit specification.
    pub fn with_spec(spec: ArimaSpec) -> Self {
        Self {
            spec,
            ar: vec![],
            ma: vec![],
            sar: vec![],
            sma: vec![],
            intercept: 0.0,
            original: None,
            seasonal_adjusted: None,
            working: None,
            fitted: None,
            residuals: None,
            residual_variance: None,
            aic: None,
            bic: None,
        }
    }

    /// The order specification.
    pub fn spec(&self) -> ArimaSpec {
        self.spec
    }

    /// AR coefficients after fitting.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// MA coefficients after fitting.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Intercept of the differenced-scale recursion.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Bayesian information criterion, where defined.
    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// One-step prediction on the working scale at time `t`, reading lagged
    /// values and residuals from the given buffers.
    fn step_prediction(&self, working: &[f64], residuals: &[f64], t: usize) -> f64 {
        let c = self.intercept;
        let mut pred = c;
        for (i, &phi) in self.ar.iter().enumerate() {
            pred += phi * (working[t - 1 - i] - c);
        }
        for (i, &phi) in self.sar.iter().enumerate() {
            pred += phi * (working[t - (i + 1) * SEASONAL_PERIOD] - c);
        }
        for (i, &theta) in self.ma.iter().enumerate() {
            pred += theta * residuals[t - 1 - i];
        }
        for (i, &theta) in self.sma.iter().enumerate() {
            pred += theta * residuals[t - (i + 1) * SEASONAL_PERIOD];
        }
        pred
    }

    /// Conditional sum of squares for a candidate parameter vector.
    fn css(spec: ArimaSpec, working: &[f64], params: &[f64]) -> f64 {
        let n = working.len();
        let start = spec.max_lag();
        if n <= start {
            return f64::MAX;
        }

        let (intercept, ar, ma, sar, sma) = split_params(spec, params);
        let mut residuals = vec![0.0; n];
        let mut css = 0.0;
        for t in start..n {
            let mut pred = intercept;
            for (i, &phi) in ar.iter().enumerate() {
                pred += phi * (working[t - 1 - i] - intercept);
            }
            for (i, &phi) in sar.iter().enumerate() {
                pred += phi * (working[t - (i + 1) * SEASONAL_PERIOD] - intercept);
            }
            for (i, &theta) in ma.iter().enumerate() {
                pred += theta * residuals[t - 1 - i];
            }
            for (i, &theta) in sma.iter().enumerate() {
                pred += theta * residuals[t - (i + 1) * SEASONAL_PERIOD];
            }
            let error = working[t] - pred;
            residuals[t] = error;
            css += error * error;
        }
        css
    }

    fn estimate_parameters(&mut self, working: &[f64]) {
        let spec = self.spec;
        let mean = working.iter().sum::<f64>() / working.len() as f64;
        let n_coef = spec.p + spec.q + spec.sp + spec.sq;

        if n_coef == 0 {
            self.intercept = mean;
            return;
        }

        let mut initial = vec![0.0; n_coef + 1];
        initial[0] = mean;
        for v in initial.iter_mut().skip(1) {
            *v = 0.1;
        }

        // Coefficients bounded inside the unit interval for stationarity
        // and invertibility.
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        bounds.extend(std::iter::repeat((-0.99, 0.99)).take(n_coef));

        let config = NelderMeadConfig {
            max_iter: 1000,
            tolerance: 1e-8,
            ..Default::default()
        };
        let result = nelder_mead(
            |params| Self::css(spec, working, params),
            &initial,
            Some(&bounds),
            config,
        );

        let (intercept, ar, ma, sar, sma) = split_params(spec, &result.optimal_point);
        self.intercept = intercept;
        self.ar = ar.to_vec();
        self.ma = ma.to_vec();
        self.sar = sar.to_vec();
        self.sma = sma.to_vec();
    }

    fn calculate_fitted(&mut self, working: &[f64]) -> Result<()> {
        let n = working.len();
        let start = self.spec.max_lag();

        let mut fitted = vec![f64::NAN; n];
        let mut residuals = vec![0.0; n];
        for t in start..n {
            let pred = self.step_prediction(working, &residuals, t);
            fitted[t] = pred;
            residuals[t] = working[t] - pred;
        }

        let valid = &residuals[start..];
        if valid.is_empty() {
            return Err(FlowError::FitFailure(
                "no residual degrees of freedom after differencing".to_string(),
            ));
        }
        let variance = valid.iter().map(|r| r * r).sum::<f64>() / valid.len() as f64;
        if !variance.is_finite() {
            return Err(FlowError::FitFailure(
                "parameter estimation diverged".to_string(),
            ));
        }
        self.residual_variance = Some(variance);

        let n_eff = valid.len() as f64;
        let k = self.spec.num_params() as f64;
        let ll = -0.5
            * n_eff
            * (1.0 + variance.max(f64::MIN_POSITIVE).ln() + (2.0 * std::f64::consts::PI).ln());
        self.aic = Some(-2.0 * ll + 2.0 * k);
        self.bic = Some(-2.0 * ll + k * n_eff.ln());

        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }
}

fn split_params(spec: ArimaSpec, params: &[f64]) -> (f64, &[f64], &[f64], &[f64], &[f64]) {
    let p_end = 1 + spec.p;
    let q_end = p_end + spec.q;
    let sp_end = q_end + spec.sp;
    (
        params[0],
        &params[1..p_end],
        &params[p_end..q_end],
        &params[q_end..sp_end],
        &params[sp_end..],
    )
}

impl Default for Arima {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl Forecaster for Arima {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        if series.has_missing() {
            return Err(FlowError::MissingValues);
        }
        let values = series.values();

        let structural = self.spec.d + self.spec.sd * SEASONAL_PERIOD + self.spec.max_lag() + 2;
        let min_len = MIN_HISTORY.max(structural);
        if values.len() < min_len {
            return Err(FlowError::InsufficientHistory {
                needed: min_len,
                got: values.len(),
            });
        }

        self.original = Some(values.to_vec());

        let seasonal_adjusted = seasonal_difference(values, self.spec.sd, SEASONAL_PERIOD);
        let working = difference(&seasonal_adjusted, self.spec.d);
        self.seasonal_adjusted = Some(seasonal_adjusted);

        self.estimate_parameters(&working);
        self.calculate_fitted(&working)?;
        self.working = Some(working);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let original = self.original.as_ref().ok_or(FlowError::FitRequired)?;
        let seasonal_adjusted = self
            .seasonal_adjusted
            .as_ref()
            .ok_or(FlowError::FitRequired)?;
        let working = self.working.as_ref().ok_or(FlowError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(FlowError::FitRequired)?;

        if horizon == 0 {
            return Ok(Forecast::from_values(vec![]));
        }

        let mut extended = working.clone();
        let mut extended_residuals = residuals.clone();
        for _ in 0..horizon {
            let t = extended.len();
            let pred = if t >= self.spec.max_lag() {
                self.step_prediction(&extended, &extended_residuals, t)
            } else {
                self.intercept
            };
            extended.push(pred);
            // Future shocks enter at their expectation of zero.
            extended_residuals.push(0.0);
        }
        let forecast_working: Vec<f64> = extended[working.len()..].to_vec();

        let on_seasonal_scale = if self.spec.d > 0 {
            integrate(&forecast_working, seasonal_adjusted, self.spec.d)
        } else {
            forecast_working
        };
        let predictions = if self.spec.sd > 0 {
            integrate_seasonal(&on_seasonal_scale, original, SEASONAL_PERIOD)
        } else {
            on_seasonal_scale
        };

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
                // Forecast variance grows linearly with horizon.
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
        if self.spec.is_seasonal() {
            "SeasonalARIMA"
        } else {
            "ARIMA"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trending_series(n: usize) -> MonthlySeries {
        let values: Vec<f64> = (0..n)
            .map(|i| 100.0 + 0.5 * i as f64 + (i as f64 * 0.3).sin())
            .collect();
        MonthlySeries::new(values, 2010, 1).unwrap()
    }

    fn seasonal_series(n: usize) -> MonthlySeries {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let month = i % 12;
                50.0 + 30.0 * (month as f64 * std::f64::consts::PI / 6.0).sin() + 0.2 * i as f64
            })
            .collect();
        MonthlySeries::new(values, 2010, 1).unwrap()
    }

    #[test]
    fn basic_fit_and_predict() {
        let mut model = Arima::new(1, 1, 1);
        model.fit(&trending_series(60)).unwrap();

        assert_eq!(model.ar_coefficients().len(), 1);
        assert_eq!(model.ma_coefficients().len(), 1);
        assert!(model.aic().is_some());
        assert!(model.bic().is_some());

        let forecast = model.predict(6).unwrap();
        assert_eq!(forecast.horizon(), 6);
        for v in forecast.point() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn ar1_recovers_positive_dependence() {
        let mut values = vec![10.0];
        for i in 1..120 {
            values.push(0.7 * values[i - 1] + 3.0 + (i as f64 * 0.9).sin());
        }
        let series = MonthlySeries::new(values, 2010, 1).unwrap();

        let mut model = Arima::new(1, 0, 0);
        model.fit(&series).unwrap();
        assert!(model.ar_coefficients()[0] > 0.3);
    }

    #[test]
    fn differencing_continues_trend() {
        let values: Vec<f64> = (0..48).map(|i| 10.0 + 2.0 * i as f64).collect();
        let series = MonthlySeries::new(values.clone(), 2010, 1).unwrap();

        let mut model = Arima::new(1, 1, 0);
        model.fit(&series).unwrap();

        let forecast = model.predict(3).unwrap();
        assert!(forecast.point()[0] > values[47] - 5.0);
    }

    #[test]
    fn seasonal_fit_tracks_annual_cycle() {
        let mut model = Arima::seasonal(1, 0, 0, 0, 1, 0);
        let series = seasonal_series(72);
        model.fit(&series).unwrap();
        assert_eq!(model.name(), "SeasonalARIMA");

        let forecast = model.predict(12).unwrap();
        assert_eq!(forecast.horizon(), 12);
        // The forecast's annual shape should echo the history: the wet-season
        // peak stays well above the dry-season trough.
        let max = forecast.point().iter().cloned().fold(f64::MIN, f64::max);
        let min = forecast.point().iter().cloned().fold(f64::MAX, f64::min);
        assert!(max - min > 20.0);
    }

    #[test]
    fn multiple_interval_bands() {
        let mut model = Arima::new(1, 1, 1);
        model.fit(&trending_series(60)).unwrap();

        let forecast = model.predict_with_intervals(6, &[0.80, 0.95]).unwrap();
        assert_eq!(forecast.bands().len(), 2);

        let narrow = forecast.band(0.80).unwrap();
        let wide = forecast.band(0.95).unwrap();
        for h in 0..6 {
            assert!(narrow.lower[h] <= forecast.point()[h]);
            assert!(narrow.upper[h] >= forecast.point()[h]);
            // Wider level, wider band.
            assert!(wide.upper[h] - wide.lower[h] >= narrow.upper[h] - narrow.lower[h]);
            // Widths grow with horizon.
            if h > 0 {
                assert!(
                    wide.upper[h] - wide.lower[h] >= wide.upper[h - 1] - wide.lower[h - 1] - 1e-9
                );
            }
        }
    }

    #[test]
    fn missing_values_rejected() {
        let mut values: Vec<f64> = (0..48).map(|i| i as f64).collect();
        values[10] = f64::NAN;
        let series = MonthlySeries::new(values, 2010, 1).unwrap();

        let mut model = Arima::new(1, 1, 1);
        assert!(matches!(model.fit(&series), Err(FlowError::MissingValues)));
    }

    #[test]
    fn short_history_rejected() {
        let series = MonthlySeries::new(vec![1.0; 20], 2010, 1).unwrap();
        let mut model = Arima::new(1, 1, 1);
        assert!(matches!(
            model.fit(&series),
            Err(FlowError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn predict_requires_fit() {
        let model = Arima::new(1, 1, 1);
        assert!(matches!(model.predict(6), Err(FlowError::FitRequired)));
    }

    #[test]
    fn zero_horizon_is_empty() {
        let mut model = Arima::new(1, 0, 0);
        model.fit(&trending_series(36)).unwrap();
        assert_eq!(model.predict(0).unwrap().horizon(), 0);
    }

    #[test]
    fn spec_parameter_count() {
        let spec = ArimaSpec::seasonal(2, 1, 1, 1, 1, 1);
        assert_eq!(spec.num_params(), 6);
        assert!(spec.is_seasonal());
        assert!(!ArimaSpec::new(1, 1, 1).is_seasonal());
    }

    #[test]
    fn mean_only_model_forecasts_mean() {
        let values = vec![5.0; 36];
        let series = MonthlySeries::new(values, 2010, 1).unwrap();
        let mut model = Arima::new(0, 0, 0);
        model.fit(&series).unwrap();
        let forecast = model.predict(4).unwrap();
        for v in forecast.point() {
            assert_relative_eq!(*v, 5.0, epsilon = 1e-8);
        }
    }
}
