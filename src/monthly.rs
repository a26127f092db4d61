//! Per-calendar-month descriptive statistics and empirical quantiles.

use crate::config::ForecastOptions;
use crate::core::MonthlySeries;
use crate::error::{FlowError, Result};
use crate::utils::stats;

/// Descriptive statistics for one calendar month.
///
/// A month with zero observations reports `count == 0` and every statistic
/// as `None`; that is a normal condition for short or partial-year series,
/// not an error. A month with fewer observations than the configured
/// minimum carries `low_confidence` so callers can qualify the output.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyStatsRow {
    /// Calendar month, 1..=12.
    pub month: u32,
    /// Non-missing observations for this month.
    pub count: usize,
    /// Minimum observed value.
    pub min: Option<f64>,
    /// Maximum observed value.
    pub max: Option<f64>,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Sample standard deviation (undefined below two observations).
    pub std_dev: Option<f64>,
    /// Coefficient of variation, sd/mean; undefined when the mean is zero.
    pub cv: Option<f64>,
    /// Requested percentile -> empirical value, in request order.
    pub quantiles: Vec<(f64, Option<f64>)>,
    /// Set when 0 < count < the configured minimum.
    pub low_confidence: bool,
}

impl MonthlyStatsRow {
    /// Look up the value for a requested percentile.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|(q, _)| (q - p).abs() < 1e-12)
            .and_then(|(_, v)| *v)
    }
}

/// Compute descriptive statistics for each calendar month 1..=12.
///
/// Missing values are dropped per month independently. `percentiles` must
/// all lie in [0, 1]; the output preserves their order. Rows are returned
/// in ascending calendar-month order.
pub fn monthly_stats(
    series: &MonthlySeries,
    percentiles: &[f64],
    options: &ForecastOptions,
) -> Result<Vec<MonthlyStatsRow>> {
    for &p in percentiles {
        if !(0.0..=1.0).contains(&p) {
            return Err(FlowError::InvalidParameter(format!(
                "percentile {p} outside [0, 1]"
            )));
        }
    }

    let mut rows = Vec::with_capacity(12);
    for month in 1..=12 {
        let values = series.month_values(month);
        rows.push(month_row(month, &values, percentiles, options));
    }
    Ok(rows)
}

fn month_row(
    month: u32,
    values: &[f64],
    percentiles: &[f64],
    options: &ForecastOptions,
) -> MonthlyStatsRow {
    let count = values.len();

    if count == 0 {
        return MonthlyStatsRow {
            month,
            count: 0,
            min: None,
            max: None,
            mean: None,
            std_dev: None,
            cv: None,
            quantiles: percentiles.iter().map(|&p| (p, None)).collect(),
            low_confidence: false,
        };
    }

    let low_confidence = count < options.min_month_count;
    if low_confidence {
        log::warn!(
            "month {} has only {} observations (minimum {}); statistics are low-confidence",
            month,
            count,
            options.min_month_count
        );
    }

    let mean = stats::mean(values);
    let sd = stats::std_dev(values);
    let std_dev = if sd.is_nan() { None } else { Some(sd) };
    let cv = match std_dev {
        Some(sd) if mean != 0.0 => Some(sd / mean),
        _ => None,
    };

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    MonthlyStatsRow {
        month,
        count,
        min: Some(min),
        max: Some(max),
        mean: Some(mean),
        std_dev,
        cv,
        quantiles: percentiles
            .iter()
            .map(|&p| (p, Some(stats::quantile(values, p))))
            .collect(),
        low_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn options() -> ForecastOptions {
        ForecastOptions::default()
    }

    /// Three full years anchored at January; month m holds m, m+12, m+24.
    fn three_year_series() -> MonthlySeries {
        let values: Vec<f64> = (1..=36).map(|i| i as f64).collect();
        MonthlySeries::new(values, 2010, 1).unwrap()
    }

    #[test]
    fn rows_cover_all_months_in_order() {
        let rows = monthly_stats(&three_year_series(), &[0.5], &options()).unwrap();
        assert_eq!(rows.len(), 12);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.month, i as u32 + 1);
            assert_eq!(row.count, 3);
            assert!(!row.low_confidence);
        }
    }

    #[test]
    fn three_point_quantiles_match_type7() {
        // January observations are exactly [1, 13, 25].
        let rows = monthly_stats(&three_year_series(), &[0.0, 0.5, 1.0], &options()).unwrap();
        let jan = &rows[0];
        assert_relative_eq!(jan.quantile(0.0).unwrap(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(jan.quantile(0.5).unwrap(), 13.0, epsilon = 1e-10);
        assert_relative_eq!(jan.quantile(1.0).unwrap(), 25.0, epsilon = 1e-10);
        assert_relative_eq!(jan.min.unwrap(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(jan.max.unwrap(), 25.0, epsilon = 1e-10);
        assert_relative_eq!(jan.mean.unwrap(), 13.0, epsilon = 1e-10);
    }

    #[test]
    fn fully_missing_month_reports_undefined() {
        // Two years; every January is NaN.
        let mut values: Vec<f64> = (1..=24).map(|i| i as f64).collect();
        values[0] = f64::NAN;
        values[12] = f64::NAN;
        let series = MonthlySeries::new(values, 2010, 1).unwrap();

        let rows = monthly_stats(&series, &[0.25, 0.75], &options()).unwrap();
        let jan = &rows[0];
        assert_eq!(jan.count, 0);
        assert!(jan.min.is_none());
        assert!(jan.mean.is_none());
        assert!(jan.std_dev.is_none());
        assert!(jan.cv.is_none());
        assert!(jan.quantiles.iter().all(|(_, v)| v.is_none()));
        assert!(!jan.low_confidence);

        // Other months still fully defined.
        assert_eq!(rows[1].count, 2);
        assert!(rows[1].mean.is_some());
    }

    #[test]
    fn short_month_flagged_low_confidence() {
        // 14 observations from January: months 1 and 2 seen twice, rest once.
        let values: Vec<f64> = (1..=14).map(|i| i as f64).collect();
        let series = MonthlySeries::new(values, 2010, 1).unwrap();

        let rows = monthly_stats(&series, &[0.5], &options()).unwrap();
        assert_eq!(rows[0].count, 2);
        assert!(rows[0].low_confidence);
        assert_eq!(rows[2].count, 1);
        assert!(rows[2].low_confidence);
        // A single observation has a quantile but no sample sd.
        assert!(rows[2].quantile(0.5).is_some());
        assert!(rows[2].std_dev.is_none());
    }

    #[test]
    fn cv_undefined_at_zero_mean() {
        // Month 1 values sum to zero.
        let values = vec![-2.0, 5.0, 2.0, 6.0];
        let series = MonthlySeries::new(values, 2010, 1).unwrap();
        let rows = monthly_stats(&series, &[], &options()).unwrap();
        assert_relative_eq!(rows[0].mean.unwrap(), 0.0, epsilon = 1e-10);
        assert!(rows[0].std_dev.is_some());
        assert!(rows[0].cv.is_none());
    }

    #[test]
    fn invalid_percentile_rejected_before_work() {
        let result = monthly_stats(&three_year_series(), &[0.5, 1.2], &options());
        assert!(matches!(result, Err(FlowError::InvalidParameter(_))));
    }

    #[test]
    fn quantile_order_preserved() {
        let rows = monthly_stats(&three_year_series(), &[0.85, 0.15, 0.5], &options()).unwrap();
        let ps: Vec<f64> = rows[0].quantiles.iter().map(|(p, _)| *p).collect();
        assert_eq!(ps, vec![0.85, 0.15, 0.5]);
    }
}
