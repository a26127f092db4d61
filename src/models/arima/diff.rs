//! Differencing and integration helpers for the ARIMA models.

/// Difference a series `d` times (each pass shortens it by one).
pub fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..d {
        if out.len() <= 1 {
            break;
        }
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Difference at seasonal lag `period`, `d` times. Each pass shortens the
/// series by `period`.
pub fn seasonal_difference(values: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return values.to_vec();
    }
    let mut out = values.to_vec();
    for _ in 0..d {
        if out.len() <= period {
            break;
        }
        out = (period..out.len()).map(|i| out[i] - out[i - period]).collect();
    }
    out
}

/// Undo `d` rounds of ordinary differencing on forecast steps, anchored on
/// the tail of the original series.
pub fn integrate(forecast_diffs: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || forecast_diffs.is_empty() {
        return forecast_diffs.to_vec();
    }

    let mut out = forecast_diffs.to_vec();
    for level in (0..d).rev() {
        let anchor = if level == 0 {
            original.last().copied().unwrap_or(0.0)
        } else {
            difference(original, level).last().copied().unwrap_or(0.0)
        };
        let mut cumsum = anchor;
        for v in out.iter_mut() {
            cumsum += *v;
            *v = cumsum;
        }
    }
    out
}

/// Undo one round of seasonal differencing on forecast steps: each step adds
/// back the value one seasonal period earlier, reading from the original
/// tail and then from already-integrated steps.
pub fn integrate_seasonal(forecast_diffs: &[f64], original: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || original.len() < period {
        return forecast_diffs.to_vec();
    }
    let tail = &original[original.len() - period..];
    let mut out: Vec<f64> = Vec::with_capacity(forecast_diffs.len());
    for (i, &d) in forecast_diffs.iter().enumerate() {
        let base = if i < period { tail[i] } else { out[i - period] };
        out.push(base + d);
    }
    out
}

/// Suggest an ordinary differencing order (0, 1, or 2) by a variance-ratio
/// heuristic: difference while it shrinks the variance by more than 10%.
pub fn suggest_differencing(values: &[f64]) -> usize {
    if values.len() < 3 {
        return 0;
    }

    let var_0 = sample_variance(values);
    let diff_1 = difference(values, 1);
    if diff_1.len() < 2 {
        return 0;
    }
    let var_1 = sample_variance(&diff_1);

    if var_0 > 0.0 && var_1 / var_0 < 0.9 {
        let diff_2 = difference(&diff_1, 1);
        if diff_2.len() >= 2 {
            let var_2 = sample_variance(&diff_2);
            if var_2 / var_1 < 0.9 && var_2 < var_0 {
                return 2;
            }
        }
        return 1;
    }
    0
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}
