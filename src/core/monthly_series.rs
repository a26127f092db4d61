//! Monthly time-series container.

use crate::error::{FlowError, Result};
use chrono::NaiveDate;

/// A fixed-period monthly time series anchored at a calendar month.
///
/// Index `i` maps to calendar month `((start_month - 1 + i) % 12) + 1`.
/// Missing observations are represented by `NaN`; they are carried through
/// construction (with a warning) and dropped per-month by the statistical
/// components. The container is never mutated in place: transformations
/// return new series.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    values: Vec<f64>,
    start_year: i32,
    start_month: u32,
}

impl MonthlySeries {
    /// Create a new monthly series.
    ///
    /// Rejects an empty value vector, a start month outside 1..=12, and
    /// infinite values (`NaN` is the only valid missing-value marker).
    pub fn new(values: Vec<f64>, start_year: i32, start_month: u32) -> Result<Self> {
        if values.is_empty() {
            return Err(FlowError::EmptySeries);
        }
        if !(1..=12).contains(&start_month) {
            return Err(FlowError::InvalidSeries(format!(
                "start month {start_month} outside 1..=12"
            )));
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(FlowError::InvalidSeries(
                "infinite values are not valid observations".to_string(),
            ));
        }

        let series = Self {
            values,
            start_year,
            start_month,
        };
        let missing = series.missing_count();
        if missing > 0 {
            log::warn!(
                "series anchored at {}-{:02} has {} missing of {} observations ({:.1}%)",
                start_year,
                start_month,
                missing,
                series.len(),
                100.0 * series.missing_fraction()
            );
        }
        Ok(series)
    }

    /// Number of observations, missing values included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All observations in chronological order (`NaN` = missing).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Anchor year of the first observation.
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Anchor month (1..=12) of the first observation.
    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// Calendar month (1..=12) of the observation at `index`.
    pub fn month_of(&self, index: usize) -> u32 {
        ((self.start_month as usize - 1 + index) % 12) as u32 + 1
    }

    /// Calendar year of the observation at `index`.
    pub fn year_of(&self, index: usize) -> i32 {
        self.start_year + ((self.start_month as usize - 1 + index) / 12) as i32
    }

    /// First-of-month date of the observation at `index`.
    pub fn date_of(&self, index: usize) -> NaiveDate {
        // Anchor is validated at construction, so the date always exists.
        NaiveDate::from_ymd_opt(self.year_of(index), self.month_of(index), 1)
            .expect("validated month anchor")
    }

    /// The (year, month) of the step immediately after the last observation.
    pub fn month_after_end(&self) -> (i32, u32) {
        (self.year_of(self.len()), self.month_of(self.len()))
    }

    /// Number of missing (`NaN`) observations.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Fraction of observations that are missing.
    pub fn missing_fraction(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.missing_count() as f64 / self.values.len() as f64
        }
    }

    /// Number of non-missing observations.
    pub fn valid_count(&self) -> usize {
        self.len() - self.missing_count()
    }

    /// Whether any observation is missing.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// All non-missing observations falling in calendar `month` (1..=12).
    pub fn month_values(&self, month: u32) -> Vec<f64> {
        self.values
            .iter()
            .enumerate()
            .filter(|(i, v)| self.month_of(*i) == month && !v.is_nan())
            .map(|(_, &v)| v)
            .collect()
    }

    /// Extract `[start, end)` as a new series re-anchored at `start`.
    pub fn slice(&self, start: usize, end: usize) -> Result<MonthlySeries> {
        if start >= end {
            return Err(FlowError::InvalidParameter(
                "slice start must be before end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(FlowError::InvalidParameter(format!(
                "slice end {} beyond series length {}",
                end,
                self.len()
            )));
        }
        Ok(MonthlySeries {
            values: self.values[start..end].to_vec(),
            start_year: self.year_of(start),
            start_month: self.month_of(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize, start_month: u32) -> MonthlySeries {
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        MonthlySeries::new(values, 2015, start_month).unwrap()
    }

    #[test]
    fn index_maps_to_calendar_month() {
        let ts = series(14, 1);
        assert_eq!(ts.month_of(0), 1);
        assert_eq!(ts.month_of(11), 12);
        assert_eq!(ts.month_of(12), 1);
        assert_eq!(ts.year_of(12), 2016);
    }

    #[test]
    fn anchor_wraps_mid_year() {
        let ts = series(8, 11);
        assert_eq!(ts.month_of(0), 11);
        assert_eq!(ts.month_of(1), 12);
        assert_eq!(ts.month_of(2), 1);
        assert_eq!(ts.year_of(2), 2016);
        assert_eq!(ts.date_of(2), NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
    }

    #[test]
    fn month_after_end_continues_calendar() {
        let ts = series(12, 3);
        assert_eq!(ts.month_after_end(), (2016, 3));

        let ts = series(2, 12);
        assert_eq!(ts.month_after_end(), (2016, 2));
    }

    #[test]
    fn rejects_invalid_anchor() {
        let result = MonthlySeries::new(vec![1.0, 2.0], 2020, 0);
        assert!(matches!(result, Err(FlowError::InvalidSeries(_))));
        let result = MonthlySeries::new(vec![1.0, 2.0], 2020, 13);
        assert!(matches!(result, Err(FlowError::InvalidSeries(_))));
    }

    #[test]
    fn rejects_empty_and_infinite() {
        assert!(matches!(
            MonthlySeries::new(vec![], 2020, 1),
            Err(FlowError::EmptySeries)
        ));
        assert!(matches!(
            MonthlySeries::new(vec![1.0, f64::INFINITY], 2020, 1),
            Err(FlowError::InvalidSeries(_))
        ));
    }

    #[test]
    fn missing_values_are_counted_not_rejected() {
        let ts = MonthlySeries::new(vec![1.0, f64::NAN, 3.0, f64::NAN], 2020, 1).unwrap();
        assert!(ts.has_missing());
        assert_eq!(ts.missing_count(), 2);
        assert_eq!(ts.valid_count(), 2);
        assert_eq!(ts.missing_fraction(), 0.5);
    }

    #[test]
    fn month_values_partition_drops_missing() {
        // Two full years starting in January; February of year one missing.
        let mut values: Vec<f64> = (0..24).map(|i| i as f64).collect();
        values[1] = f64::NAN;
        let ts = MonthlySeries::new(values, 2018, 1).unwrap();

        assert_eq!(ts.month_values(1), vec![0.0, 12.0]);
        assert_eq!(ts.month_values(2), vec![13.0]);
        assert_eq!(ts.month_values(12), vec![11.0, 23.0]);
    }

    #[test]
    fn slice_reanchors() {
        let ts = series(24, 1);
        let tail = ts.slice(13, 24).unwrap();
        assert_eq!(tail.len(), 11);
        assert_eq!(tail.start_year(), 2016);
        assert_eq!(tail.start_month(), 2);
        assert_eq!(tail.values()[0], 13.0);
    }

    #[test]
    fn slice_bounds_validated() {
        let ts = series(12, 1);
        assert!(ts.slice(5, 5).is_err());
        assert!(ts.slice(0, 13).is_err());
        assert!(ts.slice(0, 12).is_ok());
    }
}
