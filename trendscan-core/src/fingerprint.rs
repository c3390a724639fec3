//! Deterministic identities for parameter sets and candle datasets.
//!
//! - `ParamKey`: BLAKE3 of the canonical JSON of a `StrategyParams`. Two
//!   candidates with identical values share a key regardless of where they
//!   came from (grid, profile, override).
//! - `DatasetHash`: BLAKE3 over timestamps and OHLCV, so reports can name
//!   the exact data they were computed on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Candle;
use crate::params::StrategyParams;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamKey(String);

impl ParamKey {
    pub fn of(params: &StrategyParams) -> Self {
        // plain data: field order is fixed by the struct definitions
        let json = serde_json::to_vec(params).unwrap_or_default();
        Self(blake3::hash(&json).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for tables and logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(String);

impl DatasetHash {
    pub fn of_candles(candles: &[Candle]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for c in candles {
            hasher.update(&c.timestamp.to_le_bytes());
            for v in [c.open, c.high, c.low, c.close, c.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;
    use crate::params::{RegimeParams, TrendCrossParams};

    #[test]
    fn equal_params_equal_keys() {
        let a = StrategyParams::default();
        let b = StrategyParams::TrendCross(TrendCrossParams::default());
        assert_eq!(ParamKey::of(&a), ParamKey::of(&b));
        assert_eq!(ParamKey::of(&a).as_str().len(), 64);
        assert_eq!(ParamKey::of(&a).short().len(), 12);
    }

    #[test]
    fn any_field_changes_key() {
        let a = StrategyParams::default();
        let b = StrategyParams::TrendCross(TrendCrossParams {
            cooldown_candles: 7,
            ..TrendCrossParams::default()
        });
        let c = StrategyParams::RegimeOscillator(RegimeParams::default());
        assert_ne!(ParamKey::of(&a), ParamKey::of(&b));
        assert_ne!(ParamKey::of(&a), ParamKey::of(&c));
    }

    #[test]
    fn dataset_hash_tracks_values() {
        let a = make_candles(&[100.0, 101.0, 102.0]);
        let mut b = a.clone();
        assert_eq!(DatasetHash::of_candles(&a), DatasetHash::of_candles(&b));
        b[1].volume += 1.0;
        assert_ne!(DatasetHash::of_candles(&a), DatasetHash::of_candles(&b));
    }
}
