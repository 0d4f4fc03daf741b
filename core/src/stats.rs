//! Null-aware arithmetic helpers shared by the aggregation stages.
//!
//! A `None` is "no signal": ratios with a zero or missing denominator
//! produce `None` instead of an error or a non-finite value.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn ratio(numerator: f64, denominator: Option<f64>) -> Option<f64> {
    match denominator {
        Some(d) if d != 0.0 => Some(numerator / d),
        _ => None,
    }
}

/// Fractional change from `previous` to `current`.
pub fn pct_change(current: f64, previous: Option<f64>) -> Option<f64> {
    ratio(current, previous).map(|r| r - 1.0)
}

/// Trailing sum over `window` values. Defined only when the full window
/// exists and every value in it is defined.
pub fn rolling_sum(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            values[i + 1 - window..=i].iter().copied().sum::<Option<f64>>()
        })
        .collect()
}
