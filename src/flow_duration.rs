//! Flow-duration-curve scenario forecasting.
//!
//! Forecasts are drawn from the per-calendar-month empirical distribution
//! of the historical record: the P-th percentile of all past Januaries is
//! the "P scenario" forecast for a future January. A persistence variant
//! anchors the scenario on the most recent observation's percentile rank.

use std::collections::BTreeMap;

use crate::config::ForecastOptions;
use crate::core::MonthlySeries;
use crate::error::{FlowError, Result};
use crate::utils::stats;

/// Minimum history for percentile methods: one full seasonal cycle.
const MIN_SERIES_LEN: usize = 12;

/// One scenario column of a [`ScenarioForecast`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioColumn {
    /// Scenario label, e.g. "dry".
    pub label: String,
    /// Percentile behind the column, in [0, 1].
    pub percentile: f64,
    /// Forecast value per step; `None` when the target month has no
    /// historical observations.
    pub values: Vec<Option<f64>>,
}

/// One row of the plain-tabular form of a scenario table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRow {
    /// Forecast step, 1-based.
    pub step: usize,
    /// Target calendar month.
    pub month: u32,
    /// One value per scenario column, in column order.
    pub values: Vec<Option<f64>>,
}

/// Percentile-scenario forecast table.
///
/// Rows are forecast steps (step 1 = the month after the start month);
/// columns are scenarios in the order their percentiles were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioForecast {
    start_month: u32,
    months: Vec<u32>,
    columns: Vec<ScenarioColumn>,
    metadata: BTreeMap<String, f64>,
}

impl ScenarioForecast {
    /// The month the forecast was issued from (not itself forecast).
    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// Target calendar month per forecast step.
    pub fn months(&self) -> &[u32] {
        &self.months
    }

    /// Number of forecast steps.
    pub fn n_steps(&self) -> usize {
        self.months.len()
    }

    /// All scenario columns in request order.
    pub fn columns(&self) -> &[ScenarioColumn] {
        &self.columns
    }

    /// Column by label.
    pub fn column(&self, label: &str) -> Option<&ScenarioColumn> {
        self.columns.iter().find(|c| c.label == label)
    }

    /// Value at a 1-based step for a labeled scenario.
    pub fn value(&self, step: usize, label: &str) -> Option<f64> {
        self.column(label)
            .and_then(|c| c.values.get(step - 1).copied())
            .flatten()
    }

    /// Traceability metadata (e.g. `current_value`, `current_percentile`).
    pub fn metadata(&self) -> &BTreeMap<String, f64> {
        &self.metadata
    }

    /// Flatten into plain rows for export collaborators.
    pub fn to_rows(&self) -> Vec<ScenarioRow> {
        (0..self.n_steps())
            .map(|i| ScenarioRow {
                step: i + 1,
                month: self.months[i],
                values: self.columns.iter().map(|c| c.values[i]).collect(),
            })
            .collect()
    }

    /// Rebuild a table from its plain-tabular form.
    ///
    /// `specs` carries the (label, percentile) pair per column, in column
    /// order. The inverse of [`Self::to_rows`].
    pub fn from_rows(
        start_month: u32,
        specs: &[(String, f64)],
        rows: &[ScenarioRow],
    ) -> Result<Self> {
        for row in rows {
            if row.values.len() != specs.len() {
                return Err(FlowError::LengthMismatch {
                    expected: specs.len(),
                    got: row.values.len(),
                });
            }
        }
        let columns = specs
            .iter()
            .enumerate()
            .map(|(c, (label, percentile))| ScenarioColumn {
                label: label.clone(),
                percentile: *percentile,
                values: rows.iter().map(|r| r.values[c]).collect(),
            })
            .collect();
        Ok(Self {
            start_month,
            months: rows.iter().map(|r| r.month).collect(),
            columns,
            metadata: BTreeMap::new(),
        })
    }
}

/// Percentile-based scenario forecaster over a monthly series.
#[derive(Debug, Clone, Default)]
pub struct FlowDurationForecaster {
    options: ForecastOptions,
}

impl FlowDurationForecaster {
    /// Forecaster with the given options.
    pub fn new(options: ForecastOptions) -> Self {
        Self { options }
    }

    /// The option set in use.
    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    /// Calendar months targeted by steps 1..=n from `start_month`.
    ///
    /// Step 1 is the month after `start_month`; the sequence wraps at
    /// December.
    pub fn target_months(start_month: u32, n_months: usize) -> Vec<u32> {
        (1..=n_months)
            .map(|i| ((start_month as usize - 1 + i) % 12) as u32 + 1)
            .collect()
    }

    /// Forecast `n_months` values at a single percentile.
    ///
    /// Each step's value is the empirical percentile of the historical
    /// observations in the step's target month, scaled by `adjustment`.
    /// A target month with no history yields `None` for that step.
    pub fn forecast_by_percentile(
        &self,
        series: &MonthlySeries,
        start_month: u32,
        n_months: usize,
        percentile: f64,
        adjustment: f64,
    ) -> Result<Vec<Option<f64>>> {
        validate_inputs(series, start_month, n_months)?;
        if !(0.0..=1.0).contains(&percentile) {
            return Err(FlowError::InvalidParameter(format!(
                "percentile {percentile} outside [0, 1]"
            )));
        }
        if !adjustment.is_finite() {
            return Err(FlowError::InvalidParameter(
                "adjustment must be finite".to_string(),
            ));
        }

        let steps = Self::target_months(start_month, n_months)
            .into_iter()
            .map(|month| {
                let values = series.month_values(month);
                if values.is_empty() {
                    log::warn!("no historical observations for month {month}; step reported NA");
                    None
                } else {
                    Some(stats::quantile(&values, percentile) * adjustment)
                }
            })
            .collect();
        Ok(steps)
    }

    /// Forecast all configured scenarios at once.
    pub fn forecast_scenarios(
        &self,
        series: &MonthlySeries,
        start_month: u32,
        n_months: usize,
    ) -> Result<ScenarioForecast> {
        let labels: Vec<&str> = self
            .options
            .scenario_labels
            .iter()
            .map(String::as_str)
            .collect();
        self.forecast_scenarios_with(series, start_month, n_months, &self.options.percentiles, &labels)
    }

    /// Forecast one column per (percentile, label) pair, preserving order.
    pub fn forecast_scenarios_with(
        &self,
        series: &MonthlySeries,
        start_month: u32,
        n_months: usize,
        percentiles: &[f64],
        labels: &[&str],
    ) -> Result<ScenarioForecast> {
        if percentiles.len() != labels.len() {
            return Err(FlowError::LengthMismatch {
                expected: percentiles.len(),
                got: labels.len(),
            });
        }
        validate_inputs(series, start_month, n_months)?;

        let mut columns = Vec::with_capacity(percentiles.len());
        for (&p, &label) in percentiles.iter().zip(labels.iter()) {
            let values = self.forecast_by_percentile(series, start_month, n_months, p, 1.0)?;
            columns.push(ScenarioColumn {
                label: label.to_string(),
                percentile: p,
                values,
            });
        }

        Ok(ScenarioForecast {
            start_month,
            months: Self::target_months(start_month, n_months),
            columns,
            metadata: BTreeMap::new(),
        })
    }

    /// Percentile rank of `observed_value` within the historical record of
    /// calendar `month`: the fraction of past observations at or below it.
    ///
    /// Requires at least the configured minimum number of observations for
    /// that month.
    pub fn flow_percentile(
        &self,
        series: &MonthlySeries,
        month: u32,
        observed_value: f64,
    ) -> Result<f64> {
        validate_inputs(series, month, 1)?;
        let values = series.month_values(month);
        if values.len() < self.options.min_month_count {
            return Err(FlowError::InsufficientMonthData {
                month,
                count: values.len(),
                needed: self.options.min_month_count,
            });
        }
        Ok(stats::empirical_cdf(&values, observed_value))
    }

    /// Persistence-adjusted forecast from the latest observation, using the
    /// configured persistence factor.
    pub fn forecast_from_current(
        &self,
        series: &MonthlySeries,
        current_month: u32,
        current_value: f64,
        n_months: usize,
    ) -> Result<ScenarioForecast> {
        self.forecast_from_current_with_factor(
            series,
            current_month,
            current_value,
            n_months,
            self.options.persistence_factor,
        )
    }

    /// Persistence-adjusted forecast with an explicit factor.
    ///
    /// The current observation's percentile rank is multiplied by
    /// `persistence_factor` before mapping back to forecast values. A
    /// factor below 1 therefore shrinks the rank toward percentile zero
    /// (the driest scenario), not toward the median; this mirrors the
    /// historically established behavior of the method.
    pub fn forecast_from_current_with_factor(
        &self,
        series: &MonthlySeries,
        current_month: u32,
        current_value: f64,
        n_months: usize,
        persistence_factor: f64,
    ) -> Result<ScenarioForecast> {
        if !persistence_factor.is_finite() || persistence_factor < 0.0 {
            return Err(FlowError::InvalidParameter(format!(
                "persistence factor {persistence_factor} must be finite and non-negative"
            )));
        }

        let p_actual = self.flow_percentile(series, current_month, current_value)?;
        let p_forecast = (p_actual * persistence_factor).clamp(0.0, 1.0);
        log::debug!(
            "persistence forecast: month {current_month} rank {p_actual:.3} -> target percentile {p_forecast:.3}"
        );

        let values =
            self.forecast_by_percentile(series, current_month, n_months, p_forecast, 1.0)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("current_value".to_string(), current_value);
        metadata.insert("current_percentile".to_string(), p_actual);
        metadata.insert("forecast_percentile".to_string(), p_forecast);

        Ok(ScenarioForecast {
            start_month: current_month,
            months: Self::target_months(current_month, n_months),
            columns: vec![ScenarioColumn {
                label: "persistence".to_string(),
                percentile: p_forecast,
                values,
            }],
            metadata,
        })
    }
}

fn validate_inputs(series: &MonthlySeries, start_month: u32, n_months: usize) -> Result<()> {
    if series.len() < MIN_SERIES_LEN {
        return Err(FlowError::InsufficientHistory {
            needed: MIN_SERIES_LEN,
            got: series.len(),
        });
    }
    if !(1..=12).contains(&start_month) {
        return Err(FlowError::InvalidParameter(format!(
            "month {start_month} outside 1..=12"
        )));
    }
    if n_months == 0 {
        return Err(FlowError::InvalidParameter(
            "forecast horizon must be at least one month".to_string(),
        ));
    }
    Ok(())
}
