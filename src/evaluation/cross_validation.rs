//! Walk-forward cross-validation with an expanding training window.

use rayon::prelude::*;

use crate::core::MonthlySeries;
use crate::error::{FlowError, Result};
use crate::models::Forecaster;
use crate::utils::metrics::{evaluate, EvalMetrics};

/// Configuration for walk-forward validation.
#[derive(Debug, Clone)]
pub struct CvConfig {
    /// Forecast horizon per fold.
    pub horizon: usize,
    /// Training window of the first fold; later folds expand from here.
    pub initial_window: usize,
    /// Months the forecast origin advances between folds.
    pub step: usize,
}

impl CvConfig {
    /// Expanding-window configuration advancing one month per fold.
    pub fn new(initial_window: usize, horizon: usize) -> Self {
        Self {
            horizon,
            initial_window,
            step: 1,
        }
    }

    /// Set the origin step between folds.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(FlowError::InvalidParameter(
                "cross-validation horizon must be at least 1".to_string(),
            ));
        }
        if self.initial_window == 0 {
            return Err(FlowError::InvalidParameter(
                "initial training window must be at least 1".to_string(),
            ));
        }
        if self.step == 0 {
            return Err(FlowError::InvalidParameter(
                "fold step must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accuracy at one forecast lead time, aggregated across folds.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAccuracy {
    /// Lead time in months, 1-based.
    pub step: usize,
    /// RMSE over all folds at this lead; `None` with no valid pairs.
    pub rmse: Option<f64>,
    /// MAE over all folds at this lead.
    pub mae: Option<f64>,
    /// Folds contributing a valid pair at this lead.
    pub n_folds: usize,
}

/// Walk-forward validation result.
#[derive(Debug, Clone)]
pub struct CvResult {
    /// Folds that fitted and forecast successfully.
    pub n_folds: usize,
    /// Folds skipped because fit or predict failed.
    pub n_failed: usize,
    /// Accuracy per forecast lead time, index 0 = one month ahead.
    pub per_step: Vec<StepAccuracy>,
    /// Metrics pooled over every (actual, predicted) pair of every fold.
    pub overall: EvalMetrics,
}

impl CvResult {
    /// Accuracy at a 1-based lead time.
    pub fn step(&self, step: usize) -> Option<&StepAccuracy> {
        self.per_step.get(step - 1)
    }
}

/// Walk-forward validation of a model over a monthly series.
///
/// Each fold trains on `[0, origin)` and forecasts the next `horizon`
/// months against the held-out observations; the origin then advances by
/// `step`. Folds are independent and evaluated in parallel, and the
/// results are aggregated in origin order. A fold whose fit or forecast
/// fails is skipped with a warning and counted in `n_failed`.
pub fn cross_validate<M, F>(
    config: &CvConfig,
    series: &MonthlySeries,
    model_factory: F,
) -> Result<CvResult>
where
    M: Forecaster,
    F: Fn() -> M + Sync,
{
    config.validate()?;
    let n = series.len();
    let horizon = config.horizon;

    let origins: Vec<usize> = (config.initial_window..)
        .step_by(config.step)
        .take_while(|origin| origin + horizon <= n)
        .collect();
    if origins.is_empty() {
        log::warn!(
            "series of {n} months leaves no room for initial window {} plus horizon {horizon}",
            config.initial_window
        );
    }

    // One (actual, predicted) pair list per fold, in origin order.
    let folds: Vec<Option<(Vec<f64>, Vec<f64>)>> = origins
        .par_iter()
        .map(|&origin| {
            let run = || -> Result<(Vec<f64>, Vec<f64>)> {
                let train = series.slice(0, origin)?;
                let mut model = model_factory();
                model.fit(&train)?;
                let forecast = model.predict(horizon)?;
                let actual = series.values()[origin..origin + horizon].to_vec();
                Ok((actual, forecast.point().to_vec()))
            };
            match run() {
                Ok(pair) => Some(pair),
                Err(err) => {
                    log::warn!("fold at origin {origin} skipped: {err}");
                    None
                }
            }
        })
        .collect();

    let successful: Vec<&(Vec<f64>, Vec<f64>)> = folds.iter().flatten().collect();
    let n_failed = folds.len() - successful.len();

    let mut per_step = Vec::with_capacity(horizon);
    for k in 0..horizon {
        let actual: Vec<f64> = successful.iter().map(|(a, _)| a[k]).collect();
        let predicted: Vec<f64> = successful.iter().map(|(_, p)| p[k]).collect();
        let metrics = evaluate(&actual, &predicted)?;
        per_step.push(StepAccuracy {
            step: k + 1,
            rmse: metrics.rmse,
            mae: metrics.mae,
            n_folds: metrics.n_valid,
        });
    }

    let all_actual: Vec<f64> = successful
        .iter()
        .flat_map(|(a, _)| a.iter().copied())
        .collect();
    let all_predicted: Vec<f64> = successful
        .iter()
        .flat_map(|(_, p)| p.iter().copied())
        .collect();
    let overall = evaluate(&all_actual, &all_predicted)?;

    Ok(CvResult {
        n_folds: successful.len(),
        n_failed,
        per_step,
        overall,
    })
}
