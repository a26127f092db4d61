//! Forecast result structure for model predictions.

use crate::error::{FlowError, Result};
use chrono::NaiveDate;

/// Prediction interval bounds for one confidence level.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBand {
    /// Confidence level in (0, 1), e.g. 0.95.
    pub level: f64,
    /// Lower bound per horizon step.
    pub lower: Vec<f64>,
    /// Upper bound per horizon step.
    pub upper: Vec<f64>,
}

impl IntervalBand {
    /// Band from its level and bounds.
    pub fn new(level: f64, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self { level, lower, upper }
    }
}

/// Point forecasts with optional interval bands and a month axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    bands: Vec<IntervalBand>,
    /// (year, month) of the first forecast step, when known.
    origin: Option<(i32, u32)>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(point: Vec<f64>) -> Self {
        Self {
            point,
            bands: Vec::new(),
            origin: None,
        }
    }

    /// Attach the (year, month) of the first forecast step.
    pub fn with_origin(mut self, year: i32, month: u32) -> Self {
        self.origin = Some((year, month));
        self
    }

    /// Append an interval band.
    pub fn push_band(&mut self, band: IntervalBand) {
        self.bands.push(band);
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Whether the forecast holds no steps.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// All interval bands, in requested-level order.
    pub fn bands(&self) -> &[IntervalBand] {
        &self.bands
    }

    /// The band for a given confidence level, if present.
    pub fn band(&self, level: f64) -> Option<&IntervalBand> {
        self.bands
            .iter()
            .find(|b| (b.level - level).abs() < 1e-12)
    }

    /// Whether any interval band is attached.
    pub fn has_intervals(&self) -> bool {
        !self.bands.is_empty()
    }

    /// (year, month) of the first forecast step, if attached.
    pub fn origin(&self) -> Option<(i32, u32)> {
        self.origin
    }

    /// First-of-month dates for each forecast step.
    ///
    /// Errors when no origin was attached by the producing model.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let (year, month) = self.origin.ok_or_else(|| {
            FlowError::InvalidParameter("forecast has no month origin".to_string())
        })?;
        Ok((0..self.horizon())
            .map(|i| {
                let months = (month as usize - 1) + i;
                let y = year + (months / 12) as i32;
                let m = (months % 12) as u32 + 1;
                NaiveDate::from_ymd_opt(y, m, 1).expect("month arithmetic stays in range")
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_from_values() {
        let fc = Forecast::from_values(vec![1.0, 2.0, 3.0]);
        assert_eq!(fc.horizon(), 3);
        assert!(!fc.is_empty());
        assert!(!fc.has_intervals());
        assert_eq!(fc.point(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn bands_looked_up_by_level() {
        let mut fc = Forecast::from_values(vec![2.0, 3.0]);
        fc.push_band(IntervalBand {
            level: 0.80,
            lower: vec![1.5, 2.5],
            upper: vec![2.5, 3.5],
        });
        fc.push_band(IntervalBand {
            level: 0.95,
            lower: vec![1.0, 2.0],
            upper: vec![3.0, 4.0],
        });

        assert!(fc.has_intervals());
        assert_eq!(fc.bands().len(), 2);
        let band = fc.band(0.95).unwrap();
        assert_eq!(band.lower, vec![1.0, 2.0]);
        assert!(fc.band(0.50).is_none());
    }

    #[test]
    fn dates_follow_origin_across_year_boundary() {
        let fc = Forecast::from_values(vec![0.0; 4]).with_origin(2021, 11);
        let dates = fc.dates().unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2021, 11, 1).unwrap());
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(2021, 12, 1).unwrap());
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(dates[3], NaiveDate::from_ymd_opt(2022, 2, 1).unwrap());
    }

    #[test]
    fn dates_require_origin() {
        let fc = Forecast::from_values(vec![1.0]);
        assert!(fc.dates().is_err());
    }
}
