//! Indicator library: stateless numeric transforms of candle columns.
//!
//! Every function returns a series with the same length and index alignment
//! as its input. Index i depends only on inputs at or before i, and there is
//! no NaN warm-up: the first values are defined (seeded or expanding-window)
//! so that signal code can index any position without special cases.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;

pub use atr::{atr_wilder, true_range};
pub use bollinger::{bollinger_bands, BollingerBands};
pub use ema::ema;
pub use rsi::{rsi_wilder, RSI_NEUTRAL};
pub use sma::{rolling_std, sma};

/// Create synthetic hourly candles from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use crate::domain::Candle;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: i as i64 * 3_600_000,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
