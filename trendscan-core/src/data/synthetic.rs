//! Deterministic synthetic candles for development runs.
//!
//! A random walk whose drift flips sign every few days, so both trend
//! directions appear. Seeded from the symbol name: the same symbol always
//! produces the same series.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use super::source::Interval;
use crate::domain::Candle;

/// Candles per drift regime.
const REGIME_LEN: usize = 120;

pub fn synthetic_candles(symbol: &str, start_ms: i64, count: usize, interval: Interval) -> Vec<Candle> {
    warn!(symbol, count, "generating synthetic candles; results are not market data");

    let seed: [u8; 32] = *blake3::hash(symbol.to_ascii_uppercase().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut candles = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut drift = 0.0_f64;

    for i in 0..count {
        if i % REGIME_LEN == 0 {
            drift = rng.gen_range(-0.002..0.002);
        }
        let ret: f64 = drift + rng.gen_range(-0.008..0.008);
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004));
        let volume = rng.gen_range(500.0..5_000.0);

        candles.push(Candle {
            timestamp: start_ms + i as i64 * interval.millis(),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    candles
}
