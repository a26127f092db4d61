//! Holdout comparison of the model families.

use rayon::prelude::*;

use crate::core::MonthlySeries;
use crate::error::{FlowError, Result};
use crate::models::ModelFamily;
use crate::utils::metrics::{evaluate, EvalMetrics};

/// Fraction of the series held out when none is given explicitly.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// One family's holdout performance.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    /// The family behind this row.
    pub family: ModelFamily,
    /// Display label of the fitted model.
    pub name: &'static str,
    /// Holdout accuracy against the test window.
    pub metrics: EvalMetrics,
    /// In-sample AIC, where the family defines one.
    pub aic: Option<f64>,
}

/// Families ranked by holdout accuracy.
#[derive(Debug, Clone)]
pub struct ComparisonTable {
    /// Rows ordered by ascending RMSE; rows without an RMSE come last.
    pub rows: Vec<ComparisonRow>,
    /// Families that failed to fit or forecast, with the reported error.
    pub failed: Vec<(ModelFamily, String)>,
    /// Months used for training.
    pub train_len: usize,
    /// Months held out for testing.
    pub test_len: usize,
}

impl ComparisonTable {
    /// The best-ranked row, when any family succeeded.
    pub fn best(&self) -> Option<&ComparisonRow> {
        self.rows.first()
    }

    /// Row for a given family.
    pub fn row(&self, family: ModelFamily) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.family == family)
    }
}

/// Compare every model family on a chronological holdout.
///
/// The last fifth of the series is held out; see [`compare_models`].
pub fn compare_all(series: &MonthlySeries) -> Result<ComparisonTable> {
    let test_len = ((series.len() as f64 * DEFAULT_TEST_FRACTION).round() as usize).max(1);
    compare_models(series, ModelFamily::candidates(), test_len)
}

/// Compare model families on the last `test_len` months of the series.
///
/// Each family trains on the leading window and forecasts the holdout.
/// Families are fitted in parallel; ranking is by ascending holdout RMSE
/// with ties broken by the fixed family order, so the table is
/// deterministic. A family that cannot fit the training window lands in
/// `failed` instead of aborting the comparison.
pub fn compare_models(
    series: &MonthlySeries,
    families: &[ModelFamily],
    test_len: usize,
) -> Result<ComparisonTable> {
    if families.is_empty() {
        return Err(FlowError::InvalidParameter(
            "no model families to compare".to_string(),
        ));
    }
    if test_len == 0 || test_len >= series.len() {
        return Err(FlowError::InvalidParameter(format!(
            "holdout of {test_len} months does not fit a series of {} months",
            series.len()
        )));
    }
    let train_len = series.len() - test_len;

    let train = series.slice(0, train_len)?;
    let actual = &series.values()[train_len..];

    let outcomes: Vec<std::result::Result<ComparisonRow, (ModelFamily, String)>> = families
        .par_iter()
        .map(|&family| {
            let run = || -> Result<ComparisonRow> {
                let mut model = family.build();
                model.fit(&train)?;
                let forecast = model.predict(test_len)?;
                let metrics = evaluate(actual, forecast.point())?;
                Ok(ComparisonRow {
                    family,
                    name: family.label(),
                    metrics,
                    aic: model.aic(),
                })
            };
            run().map_err(|err| {
                log::warn!("family {} excluded from comparison: {err}", family.label());
                (family, err.to_string())
            })
        })
        .collect();

    let mut rows = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(row) => rows.push(row),
            Err(fail) => failed.push(fail),
        }
    }

    // Stable sort keeps the family order among equal or missing RMSEs.
    rows.sort_by(|a, b| match (a.metrics.rmse, b.metrics.rmse) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    Ok(ComparisonTable {
        rows,
        failed,
        train_len,
        test_len,
    })
}
