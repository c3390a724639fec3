//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seed: EMA[0] = x[0]. No warm-up truncation; every index carries a value.

/// EMA of `series`, same length as the input.
///
/// A period of 0 is treated as 1 (the series itself).
pub fn ema(series: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = series.first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(series.len());
    out.push(first);

    let mut prev = first;
    for &x in &series[1..] {
        let value = x * alpha + prev * (1.0 - alpha);
        out.push(value);
        prev = value;
    }

    out
}
