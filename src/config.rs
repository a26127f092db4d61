//! Run configuration for forecasting entry points.

use crate::error::{FlowError, Result};

/// Immutable options shared by the forecasting entry points.
///
/// Replaces ambient configuration: every component that needs the scenario
/// percentile set, labels, or thresholds receives an `ForecastOptions`
/// value explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    /// Scenario percentiles, each in [0, 1], in presentation order.
    pub percentiles: Vec<f64>,
    /// Scenario labels, parallel to `percentiles`.
    pub scenario_labels: Vec<String>,
    /// Shrink factor applied to the current observation's percentile rank
    /// in persistence-adjusted forecasts.
    pub persistence_factor: f64,
    /// Minimum observations a calendar month needs before its empirical
    /// distribution is considered reliable.
    pub min_month_count: usize,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            percentiles: vec![0.15, 0.30, 0.50, 0.70, 0.85],
            scenario_labels: vec![
                "dry".to_string(),
                "below_normal".to_string(),
                "normal".to_string(),
                "above_normal".to_string(),
                "wet".to_string(),
            ],
            persistence_factor: 0.8,
            min_month_count: 3,
        }
    }
}

impl ForecastOptions {
    /// Options with the default scenario set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scenario percentile/label pairs.
    pub fn with_scenarios(mut self, percentiles: Vec<f64>, labels: Vec<String>) -> Self {
        self.percentiles = percentiles;
        self.scenario_labels = labels;
        self
    }

    /// Replace the persistence factor.
    pub fn with_persistence_factor(mut self, factor: f64) -> Self {
        self.persistence_factor = factor;
        self
    }

    /// Replace the per-month minimum observation count.
    pub fn with_min_month_count(mut self, count: usize) -> Self {
        self.min_month_count = count;
        self
    }

    /// Check internal consistency of the option set.
    pub fn validate(&self) -> Result<()> {
        if self.percentiles.len() != self.scenario_labels.len() {
            return Err(FlowError::LengthMismatch {
                expected: self.percentiles.len(),
                got: self.scenario_labels.len(),
            });
        }
        for &p in &self.percentiles {
            if !(0.0..=1.0).contains(&p) {
                return Err(FlowError::InvalidParameter(format!(
                    "percentile {p} outside [0, 1]"
                )));
            }
        }
        if !self.persistence_factor.is_finite() || self.persistence_factor < 0.0 {
            return Err(FlowError::InvalidParameter(format!(
                "persistence factor {} must be finite and non-negative",
                self.persistence_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let opts = ForecastOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.percentiles.len(), opts.scenario_labels.len());
        assert_eq!(opts.min_month_count, 3);
        assert_eq!(opts.persistence_factor, 0.8);
    }

    #[test]
    fn mismatched_scenario_labels_rejected() {
        let opts = ForecastOptions::new()
            .with_scenarios(vec![0.25, 0.75], vec!["low".to_string()]);
        assert!(matches!(
            opts.validate(),
            Err(FlowError::LengthMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn out_of_range_percentile_rejected() {
        let opts = ForecastOptions::new()
            .with_scenarios(vec![1.5], vec!["impossible".to_string()]);
        assert!(matches!(
            opts.validate(),
            Err(FlowError::InvalidParameter(_))
        ));
    }

    #[test]
    fn negative_persistence_factor_rejected() {
        let opts = ForecastOptions::new().with_persistence_factor(-0.2);
        assert!(matches!(
            opts.validate(),
            Err(FlowError::InvalidParameter(_))
        ));
    }
}
