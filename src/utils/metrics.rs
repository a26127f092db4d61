//! Forecast error metrics.

use crate::error::{FlowError, Result};

/// Error metrics over paired (actual, predicted) values.
///
/// Pairs containing a missing value are dropped before computation; when no
/// valid pair remains every metric is `None` and `n_valid` is zero. This is
/// the "no valid data" condition, reported rather than raised.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalMetrics {
    /// Number of pairs that entered the computation.
    pub n_valid: usize,
    /// Root mean squared error.
    pub rmse: Option<f64>,
    /// Mean absolute error.
    pub mae: Option<f64>,
    /// Mean absolute percentage error; terms with `actual == 0` excluded,
    /// `None` when no term survives.
    pub mape: Option<f64>,
    /// Squared Pearson correlation of actual and predicted; `None` when
    /// either side is constant or fewer than two pairs remain.
    pub r_squared: Option<f64>,
    /// Mean of (actual - predicted).
    pub bias: Option<f64>,
}

impl EvalMetrics {
    /// The all-undefined result for zero valid pairs.
    fn empty() -> Self {
        Self {
            n_valid: 0,
            rmse: None,
            mae: None,
            mape: None,
            r_squared: None,
            bias: None,
        }
    }
}

/// Compute error metrics between actual and predicted values.
///
/// Only a length mismatch is a hard error; missing data degrades to
/// undefined metrics.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<EvalMetrics> {
    if actual.len() != predicted.len() {
        return Err(FlowError::LengthMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let pairs: Vec<(f64, f64)> = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, p)| !a.is_nan() && !p.is_nan())
        .map(|(&a, &p)| (a, p))
        .collect();

    if pairs.is_empty() {
        log::warn!("no valid (actual, predicted) pairs; metrics undefined");
        return Ok(EvalMetrics::empty());
    }

    let n = pairs.len() as f64;
    let mse = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n;
    let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let bias = pairs.iter().map(|(a, p)| a - p).sum::<f64>() / n;

    let mape_terms: Vec<f64> = pairs
        .iter()
        .filter(|(a, _)| *a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .filter(|t| t.is_finite())
        .collect();
    let mape = if mape_terms.is_empty() {
        None
    } else {
        Some(100.0 * mape_terms.iter().sum::<f64>() / mape_terms.len() as f64)
    };

    Ok(EvalMetrics {
        n_valid: pairs.len(),
        rmse: Some(mse.sqrt()),
        mae: Some(mae),
        mape,
        r_squared: correlation(&pairs).map(|r| r * r),
        bias: Some(bias),
    })
}

/// Pearson correlation of the paired values; `None` when undefined.
fn correlation(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_p = pairs.iter().map(|(_, p)| p).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_p = 0.0;
    for (a, p) in pairs {
        cov += (a - mean_a) * (p - mean_p);
        var_a += (a - mean_a).powi(2);
        var_p += (p - mean_p).powi(2);
    }
    if var_a == 0.0 || var_p == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_p.sqrt()))
}
