//! Relative Strength Index (RSI) with Wilder smoothing.
//!
//! Seed: avg_gain / avg_loss = simple mean of the first `period` changes.
//! Then: avg = (prev_avg * (period - 1) + current) / period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss); avg_loss == 0 gives 100.
//!
//! The seed averages feed the first smoothing step, so the first non-neutral
//! value is at index `period + 1`; every earlier index holds 50.

/// Neutral RSI reported before enough changes exist.
pub const RSI_NEUTRAL: f64 = 50.0;

pub fn rsi_wilder(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut out = vec![RSI_NEUTRAL; n];
    let period = period.max(1);

    if n < period + 2 {
        return out;
    }

    let changes: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / p;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / p;

    for (i, &change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
        out[i + 1] = rsi_value(avg_gain, avg_loss);
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
