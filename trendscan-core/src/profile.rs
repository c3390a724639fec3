//! Named parameter profiles with per-symbol overrides.
//!
//! Resolution is a pure lookup: (profile name, symbol) → `StrategyParams`.
//! Nothing here is mutated after construction; callers that need a different
//! mapping build a new `ProfileBook` (or load one from TOML).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::params::{ParamError, RegimeParams, StrategyParams, StrategyVariant, TrendCrossParams};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile '{name}' (available: {})", available.join(", "))]
    UnknownProfile {
        name: String,
        available: Vec<String>,
    },
    #[error("override for {symbol} in profile '{profile}' is invalid")]
    InvalidOverride {
        profile: String,
        symbol: String,
        #[source]
        source: ParamError,
    },
    #[error("failed to parse profile file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read profile file: {0}")]
    Io(#[from] std::io::Error),
}

/// One named parameter set plus sparse per-symbol field overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub description: String,
    pub params: StrategyParams,
    /// Symbol (upper-case) → field name → value.
    #[serde(default)]
    pub symbol_overrides: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl Profile {
    pub fn new(description: &str, params: StrategyParams) -> Self {
        Self {
            description: description.to_string(),
            params,
            symbol_overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, symbol: &str, fields: &[(&str, serde_json::Value)]) -> Self {
        let entry = self
            .symbol_overrides
            .entry(symbol.to_ascii_uppercase())
            .or_default();
        for (k, v) in fields {
            entry.insert((*k).to_string(), v.clone());
        }
        self
    }

    pub fn variant(&self) -> StrategyVariant {
        self.params.variant()
    }
}

/// The full profile mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBook {
    pub default_profile: String,
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for ProfileBook {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileBook {
    /// The built-in profiles.
    pub fn builtin() -> Self {
        use serde_json::json;

        let trend = |sl: f64, tp: f64, cooldown: usize| {
            StrategyParams::TrendCross(TrendCrossParams {
                stop_loss_atr_mult: sl,
                take_profit_atr_mult: tp,
                cooldown_candles: cooldown,
                ..TrendCrossParams::default()
            })
        };

        let mut profiles = BTreeMap::new();
        profiles.insert(
            "baseline".to_string(),
            Profile::new("Original wide take-profit", trend(2.0, 3.0, 1)),
        );
        profiles.insert(
            "balanced".to_string(),
            Profile::new("Wider stop, wider target", trend(3.0, 4.0, 1)),
        );
        profiles.insert(
            "win_rate".to_string(),
            Profile::new("Higher hit rate with post-loss cooldown", trend(3.0, 2.5, 6))
                .with_override(
                    "ETH",
                    &[
                        ("stop_loss_atr_mult", json!(3.5)),
                        ("take_profit_atr_mult", json!(2.0)),
                    ],
                ),
        );
        profiles.insert(
            "nfi".to_string(),
            Profile::new(
                "Regime + oscillator pullback entries, both sides",
                StrategyParams::RegimeOscillator(RegimeParams::default()),
            )
            .with_override(
                "ETH",
                &[
                    ("rsi_fast_buy", json!(21.0)),
                    ("rsi_main_buy", json!(34.0)),
                    ("rsi_fast_sell", json!(75.0)),
                    ("rsi_main_sell", json!(62.0)),
                    ("stop_loss_atr_mult", json!(2.8)),
                    ("take_profit_atr_mult", json!(2.8)),
                ],
            ),
        );

        Self {
            default_profile: "win_rate".to_string(),
            profiles,
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, ProfileError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&Profile, ProfileError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileError::UnknownProfile {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Effective parameters for `symbol` under the named profile.
    pub fn resolve(&self, name: &str, symbol: &str) -> Result<StrategyParams, ProfileError> {
        let profile = self.get(name)?;
        let key = symbol.to_ascii_uppercase();
        let overrides = profile
            .symbol_overrides
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(&key))
            .map(|(_, o)| o);

        match overrides {
            None => Ok(profile.params.clone()),
            Some(fields) => profile.params.with_overrides(fields).map_err(|source| {
                ProfileError::InvalidOverride {
                    profile: name.to_string(),
                    symbol: key,
                    source,
                }
            }),
        }
    }

    pub fn resolve_default(&self, symbol: &str) -> Result<StrategyParams, ProfileError> {
        self.resolve(&self.default_profile, symbol)
    }

    /// Profile names whose parameters use the given variant, in name order.
    pub fn names_for(&self, variant: StrategyVariant) -> Vec<String> {
        self.profiles
            .iter()
            .filter(|(_, p)| p.variant() == variant)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// The profile used as the baseline guard for a variant.
    pub fn baseline_for(&self, variant: StrategyVariant) -> Result<&str, ProfileError> {
        let preferred = match variant {
            StrategyVariant::TrendCross => self.default_profile.as_str(),
            StrategyVariant::RegimeOscillator => "nfi",
        };
        match self.profiles.get(preferred) {
            Some(p) if p.variant() == variant => Ok(preferred),
            _ => self
                .profiles
                .iter()
                .find(|(_, p)| p.variant() == variant)
                .map(|(n, _)| n.as_str())
                .ok_or_else(|| ProfileError::UnknownProfile {
                    name: format!("<{variant} baseline>"),
                    available: self.names(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_default_is_win_rate() {
        let book = ProfileBook::builtin();
        assert_eq!(book.default_profile, "win_rate");
        let p = book.resolve_default("BTC").unwrap();
        assert_eq!(p.stop_loss_atr_mult(), 3.0);
        assert_eq!(p.take_profit_atr_mult(), 2.5);
        assert_eq!(p.cooldown_candles(), 6);
    }

    #[test]
    fn symbol_override_is_case_insensitive() {
        let book = ProfileBook::builtin();
        for sym in ["ETH", "eth", "Eth"] {
            let p = book.resolve("win_rate", sym).unwrap();
            assert_eq!(p.stop_loss_atr_mult(), 3.5);
            assert_eq!(p.take_profit_atr_mult(), 2.0);
        }
        // other symbols keep the base
        assert_eq!(book.resolve("win_rate", "SOL").unwrap().take_profit_atr_mult(), 2.5);
    }

    #[test]
    fn nfi_eth_override() {
        let book = ProfileBook::builtin();
        match book.resolve("nfi", "eth").unwrap() {
            StrategyParams::RegimeOscillator(p) => {
                assert_eq!(p.rsi_fast_buy, 21.0);
                assert_eq!(p.rsi_main_buy, 34.0);
                assert_eq!(p.rsi_fast_sell, 75.0);
                assert_eq!(p.stop_loss_atr_mult, 2.8);
                assert_eq!(p.take_profit_atr_mult, 2.8);
                assert_eq!(p.ema_long, 200);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_profile_lists_names() {
        let err = ProfileBook::builtin().resolve("yolo", "BTC").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("yolo"));
        assert!(msg.contains("balanced, baseline, nfi, win_rate"));
    }

    #[test]
    fn baselines_per_variant() {
        let book = ProfileBook::builtin();
        assert_eq!(book.baseline_for(StrategyVariant::TrendCross).unwrap(), "win_rate");
        assert_eq!(book.baseline_for(StrategyVariant::RegimeOscillator).unwrap(), "nfi");
        assert_eq!(
            book.names_for(StrategyVariant::TrendCross),
            vec!["balanced", "baseline", "win_rate"]
        );
    }

    #[test]
    fn load_from_toml_file() {
        let src = r#"
default_profile = "tight"

[profiles.tight]
description = "tight stops"
params = { variant = "trend_cross", stop_loss_atr_mult = 1.5, take_profit_atr_mult = 2.0 }

[profiles.tight.symbol_overrides.SOL]
cooldown_candles = 3
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.toml");
        std::fs::write(&path, src).unwrap();

        let book = ProfileBook::from_file(&path).unwrap();
        let p = book.resolve_default("sol").unwrap();
        assert_eq!(p.stop_loss_atr_mult(), 1.5);
        assert_eq!(p.cooldown_candles(), 3);
        assert_eq!(book.resolve_default("BTC").unwrap().cooldown_candles(), 6);
    }

    #[test]
    fn bad_override_reports_symbol() {
        let book = ProfileBook::builtin();
        let mut broken = book.clone();
        if let Some(p) = broken.profiles.get_mut("baseline") {
            *p = p.clone().with_override("BTC", &[("no_such_field", serde_json::json!(1))]);
        }
        let err = broken.resolve("baseline", "btc").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidOverride { ref symbol, .. } if symbol == "BTC"));
    }
}
