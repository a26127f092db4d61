//! Automatic ARIMA order selection by information criterion.

use rayon::prelude::*;

use crate::core::{Forecast, MonthlySeries};
use crate::error::{FlowError, Result};
use crate::models::arima::diff::suggest_differencing;
use crate::models::arima::model::{Arima, ArimaSpec, SEASONAL_PERIOD};
use crate::models::Forecaster;

/// Search configuration for [`AutoArima`].
#[derive(Debug, Clone)]
pub struct AutoArimaConfig {
    /// Maximum non-seasonal AR order to consider.
    pub max_p: usize,
    /// Maximum non-seasonal MA order to consider.
    pub max_q: usize,
    /// Whether to include seasonal candidates at the annual lag.
    pub seasonal: bool,
    /// Maximum seasonal AR order.
    pub max_sp: usize,
    /// Maximum seasonal MA order.
    pub max_sq: usize,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 2,
            max_q: 2,
            seasonal: false,
            max_sp: 1,
            max_sq: 1,
        }
    }
}

impl AutoArimaConfig {
    /// Enable seasonal candidates.
    pub fn with_seasonal(mut self) -> Self {
        self.seasonal = true;
        self
    }

    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_q = max_q;
        self
    }
}

/// ARIMA with automatically selected orders.
///
/// The differencing orders come from variance-ratio heuristics; the AR and
/// MA orders are picked by exhaustively fitting a fixed candidate grid and
/// keeping the lowest AIC. The grid is enumerated in a fixed order and ties
/// keep the earlier candidate, so selection is deterministic.
#[derive(Debug, Clone)]
pub struct AutoArima {
    config: AutoArimaConfig,
    selected: Option<Arima>,
    scores: Vec<(ArimaSpec, f64)>,
}

impl AutoArima {
    /// Search with the default configuration.
    pub fn new() -> Self {
        Self::with_config(AutoArimaConfig::default())
    }

    /// Search with an explicit configuration.
    pub fn with_config(config: AutoArimaConfig) -> Self {
        Self {
            config,
            selected: None,
            scores: Vec::new(),
        }
    }

    /// Search including seasonal candidates at the annual lag.
    pub fn seasonal() -> Self {
        Self::with_config(AutoArimaConfig::default().with_seasonal())
    }

    /// The specification the search settled on.
    pub fn selected_spec(&self) -> Option<ArimaSpec> {
        self.selected.as_ref().map(Arima::spec)
    }

    /// AIC per successfully fitted candidate, in grid order.
    pub fn candidate_scores(&self) -> &[(ArimaSpec, f64)] {
        &self.scores
    }

    /// D=1 when seasonal differencing shrinks the variance well below the
    /// original level.
    fn suggest_seasonal_differencing(values: &[f64]) -> usize {
        if values.len() < 2 * SEASONAL_PERIOD {
            return 0;
        }
        let diffs: Vec<f64> = (SEASONAL_PERIOD..values.len())
            .map(|i| values[i] - values[i - SEASONAL_PERIOD])
            .collect();
        if population_variance(&diffs) < population_variance(values) * 0.7 {
            1
        } else {
            0
        }
    }

    fn candidates(&self, d: usize, sd: usize) -> Vec<ArimaSpec> {
        let mut out = Vec::new();
        for p in 0..=self.config.max_p {
            for q in 0..=self.config.max_q {
                out.push(ArimaSpec::seasonal(p, d, q, 0, sd, 0));
                if self.config.seasonal {
                    for sp in 0..=self.config.max_sp {
                        for sq in 0..=self.config.max_sq {
                            if sp > 0 || sq > 0 {
                                out.push(ArimaSpec::seasonal(p, d, q, sp, sd, sq));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

impl Default for AutoArima {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoArima {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        if series.has_missing() {
            return Err(FlowError::MissingValues);
        }
        let values = series.values();

        let sd = if self.config.seasonal {
            Self::suggest_seasonal_differencing(values)
        } else {
            0
        };
        let remainder: Vec<f64> = if sd > 0 {
            (SEASONAL_PERIOD..values.len())
                .map(|i| values[i] - values[i - SEASONAL_PERIOD])
                .collect()
        } else {
            values.to_vec()
        };
        let d = suggest_differencing(&remainder);

        // Fit the whole grid; keep per-candidate results in grid order so
        // the argmin is reproducible across runs and thread counts.
        let fits: Vec<Option<(Arima, f64)>> = self
            .candidates(d, sd)
            .into_par_iter()
            .map(|spec| {
                let mut model = Arima::with_spec(spec);
                match model.fit(series) {
                    Ok(()) => model
                        .aic()
                        .filter(|a| a.is_finite())
                        .map(|aic| (model, aic)),
                    Err(err) => {
                        log::debug!("candidate {spec:?} rejected: {err}");
                        None
                    }
                }
            })
            .collect();

        self.scores = fits
            .iter()
            .flatten()
            .map(|(m, aic)| (m.spec(), *aic))
            .collect();

        let best = fits
            .into_iter()
            .flatten()
            .reduce(|best, cand| if cand.1 < best.1 { cand } else { best });
        match best {
            Some((model, aic)) => {
                log::debug!("selected {:?} with AIC {aic:.2}", model.spec());
                self.selected = Some(model);
                Ok(())
            }
            None => Err(FlowError::FitFailure(
                "no candidate order produced a usable fit".to_string(),
            )),
        }
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.selected
            .as_ref()
            .ok_or(FlowError::FitRequired)?
            .predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        self.selected
            .as_ref()
            .ok_or(FlowError::FitRequired)?
            .predict_with_intervals(horizon, levels)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(Forecaster::fitted_values)
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(Forecaster::residuals)
    }

    fn aic(&self) -> Option<f64> {
        self.selected.as_ref().and_then(Forecaster::aic)
    }

    fn name(&self) -> &str {
        "AutoARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seasonal_series(n: usize) -> MonthlySeries {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let month = i % 12;
                60.0 + 25.0 * (month as f64 * std::f64::consts::PI / 6.0).sin() + 0.1 * i as f64
            })
            .collect();
        MonthlySeries::new(values, 2008, 1).unwrap()
    }

    #[test]
    fn search_selects_a_model() {
        let mut model = AutoArima::new();
        model.fit(&seasonal_series(72)).unwrap();

        assert!(model.is_fitted());
        assert!(model.selected_spec().is_some());
        assert!(!model.candidate_scores().is_empty());

        let forecast = model.predict(6).unwrap();
        assert_eq!(forecast.horizon(), 6);
    }

    #[test]
    fn selected_spec_has_lowest_recorded_aic() {
        let mut model = AutoArima::new();
        model.fit(&seasonal_series(72)).unwrap();

        let best_aic = model.aic().unwrap();
        for (_, aic) in model.candidate_scores() {
            assert!(best_aic <= *aic + 1e-9);
        }
    }

    #[test]
    fn search_is_deterministic() {
        let series = seasonal_series(72);
        let mut a = AutoArima::seasonal();
        let mut b = AutoArima::seasonal();
        a.fit(&series).unwrap();
        b.fit(&series).unwrap();
        assert_eq!(a.selected_spec(), b.selected_spec());
        assert_eq!(a.predict(6).unwrap().point(), b.predict(6).unwrap().point());
    }

    #[test]
    fn seasonal_differencing_detected_on_strong_cycle() {
        let series = seasonal_series(96);
        let sd = AutoArima::suggest_seasonal_differencing(series.values());
        assert_eq!(sd, 1);
    }

    #[test]
    fn predict_requires_fit() {
        let model = AutoArima::new();
        assert!(matches!(model.predict(3), Err(FlowError::FitRequired)));
    }

    #[test]
    fn missing_values_rejected() {
        let mut values: Vec<f64> = (0..48).map(|i| i as f64).collect();
        values[5] = f64::NAN;
        let series = MonthlySeries::new(values, 2010, 1).unwrap();
        let mut model = AutoArima::new();
        assert!(matches!(model.fit(&series), Err(FlowError::MissingValues)));
    }
}
