//! Bollinger Bands.
//!
//! Middle = SMA(period)
//! Upper  = Middle + k * rolling_std(period)
//! Lower  = Middle - k * rolling_std(period)

use super::sma::{rolling_std, sma};

/// The three bands, pointwise aligned with the input series.
#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(series: &[f64], period: usize, k: f64) -> BollingerBands {
    let middle = sma(series, period);
    let std = rolling_std(series, period);
    let upper = middle.iter().zip(&std).map(|(m, s)| m + k * s).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - k * s).collect();
    BollingerBands {
        middle,
        upper,
        lower,
    }
}
