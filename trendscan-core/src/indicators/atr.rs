//! Average True Range (ATR) with Wilder smoothing.
//!
//! True Range = max(high - low, |high - prev_close|, |low - prev_close|)
//! For 1 <= i <= period: ATR[i] = running mean of TR[1..=i].
//! Afterwards: ATR[i] = (ATR[i-1] * (period - 1) + TR[i]) / period.
//! ATR[0] = 0 (no previous close).

/// True range of one candle given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

pub fn atr_wilder(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![0.0; n];
    let usable = n.min(highs.len()).min(lows.len());
    if usable < 2 {
        return out;
    }

    let period = period.max(1);
    let p = period as f64;
    let mut running = 0.0;

    for i in 1..usable {
        let tr = true_range(highs[i], lows[i], closes[i - 1]);
        out[i] = if i <= period {
            running += tr;
            running / i as f64
        } else {
            (out[i - 1] * (p - 1.0) + tr) / p
        };
    }

    out
}
