//! Strategy parameters, account constants and the exit-fee schedule.
//!
//! Parameter sets are immutable values: a search candidate, a profile and a
//! per-symbol override all produce a fresh `StrategyParams` rather than
//! mutating shared configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::domain::{ExitReason, Side};

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("{name} must be >= 1 (got {value})")]
    InvalidPeriod { name: &'static str, value: usize },
    #[error("{name} must be a positive finite number (got {value})")]
    InvalidMultiple { name: &'static str, value: f64 },
    #[error("cooldown_candles must be >= 1 so a losing exit blocks the next candle")]
    ZeroCooldown,
    #[error("unknown parameter '{key}' for {variant}")]
    UnknownKey { key: String, variant: StrategyVariant },
    #[error("invalid parameter override: {0}")]
    Override(#[from] serde_json::Error),
}

// ─── Account / execution model ───────────────────────────────────────

/// Account constants shared by every simulation and live evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub initial_capital: f64,
    /// Taker fee as a fraction of notional, charged on both legs.
    pub taker_fee: f64,
    /// Minimum net profit fraction at take-profit for an entry to pass the fee gate.
    pub min_profit_after_fee: f64,
    pub default_leverage: f64,
    pub max_leverage: f64,
    pub max_position_usd: f64,
    pub min_order_value: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100.0,
            taker_fee: 0.00035,
            min_profit_after_fee: 0.005,
            default_leverage: 2.0,
            max_leverage: 3.0,
            max_position_usd: 294.0,
            min_order_value: 10.0,
        }
    }
}

impl AccountConfig {
    /// Largest notional the account may open at the given balance.
    pub fn position_cap(&self, balance: f64) -> f64 {
        (balance * self.default_leverage)
            .min(balance * self.max_leverage)
            .min(self.max_position_usd)
    }

    /// Confidence-scaled notional, rounded to cents.
    pub fn position_size(&self, sizing: PositionSizing, balance: f64, confidence: f64) -> f64 {
        let base = match sizing {
            PositionSizing::MaxPosition => self.max_position_usd,
            PositionSizing::BalanceCapped => self.position_cap(balance),
        };
        round_cents(base * confidence)
    }
}

/// What a signal's confidence scales into a notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSizing {
    /// `max_position_usd`, independent of balance.
    MaxPosition,
    /// `position_cap(balance)`.
    BalanceCapped,
}

pub(crate) fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ─── Direction gating ────────────────────────────────────────────────

/// Which directions a strategy may open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    #[default]
    Both,
    LongOnly,
    ShortOnly,
}

impl TradeSide {
    pub fn allows(self, side: Side) -> bool {
        match (self, side) {
            (TradeSide::Both, _) => true,
            (TradeSide::LongOnly, Side::Long) => true,
            (TradeSide::ShortOnly, Side::Short) => true,
            _ => false,
        }
    }
}

// ─── Exit fees ───────────────────────────────────────────────────────

/// How the round-trip taker fee is charged when a position closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitFees {
    /// Take-profit pays open fee + fee on the grown notional; other exits pay 2x fee.
    ScaledOnTakeProfit,
    /// Every exit pays open fee + fee on notional * (1 + pnl fraction).
    Scaled,
}

impl ExitFees {
    pub fn round_trip(self, reason: ExitReason, size_usd: f64, pnl_frac: f64, taker_fee: f64) -> f64 {
        let scaled = size_usd * taker_fee + size_usd * (1.0 + pnl_frac) * taker_fee;
        match self {
            ExitFees::Scaled => scaled,
            ExitFees::ScaledOnTakeProfit if reason == ExitReason::TakeProfit => scaled,
            ExitFees::ScaledOnTakeProfit => size_usd * taker_fee * 2.0,
        }
    }
}

// ─── Variants ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVariant {
    TrendCross,
    RegimeOscillator,
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyVariant::TrendCross => f.write_str("trend_cross"),
            StrategyVariant::RegimeOscillator => f.write_str("regime_oscillator"),
        }
    }
}

/// EMA-cross trend variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendCrossParams {
    pub fast_period: usize,
    pub mid_period: usize,
    pub slow_period: usize,
    pub atr_period: usize,
    pub stop_loss_atr_mult: f64,
    pub take_profit_atr_mult: f64,
    pub cooldown_candles: usize,
    pub max_hold_candles: Option<usize>,
    /// Long requires close > mid EMA, short requires close < mid EMA.
    pub use_price_filter: bool,
    /// Minimum |fast - mid| / mid, in percent.
    pub min_ema_spread_pct: f64,
    pub trade_side: TradeSide,
    pub warmup_candles: usize,
}

impl Default for TrendCrossParams {
    fn default() -> Self {
        Self {
            fast_period: 9,
            mid_period: 21,
            slow_period: 55,
            atr_period: 14,
            stop_loss_atr_mult: 3.0,
            take_profit_atr_mult: 2.5,
            cooldown_candles: 6,
            max_hold_candles: None,
            use_price_filter: false,
            min_ema_spread_pct: 0.0,
            trade_side: TradeSide::Both,
            warmup_candles: 60,
        }
    }
}

/// Regime + oscillator variant with independent long and short rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    pub ema_fast: usize,
    pub ema_trend: usize,
    pub ema_long: usize,
    pub rsi_fast: usize,
    pub rsi_main: usize,
    pub atr_period: usize,
    pub bb_period: usize,
    pub bb_stddev: f64,
    pub volume_sma_period: usize,

    // ── Long ──
    pub rsi_fast_buy: f64,
    pub rsi_main_buy: f64,
    pub bb_touch_buffer: f64,
    pub ema_pullback_buffer: f64,
    pub regime_price_floor: f64,
    pub max_breakdown_pct: f64,

    // ── Short ──
    pub enable_short: bool,
    pub rsi_fast_sell: f64,
    pub rsi_main_sell: f64,
    pub bb_reject_buffer: f64,
    pub ema_bounce_buffer: f64,
    pub regime_price_ceiling: f64,
    pub max_breakout_pct: f64,

    pub min_volume_ratio: f64,
    pub stop_loss_atr_mult: f64,
    pub take_profit_atr_mult: f64,
    pub cooldown_candles: usize,
    pub max_hold_candles: Option<usize>,
    pub trade_side: TradeSide,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_trend: 50,
            ema_long: 200,
            rsi_fast: 4,
            rsi_main: 14,
            atr_period: 14,
            bb_period: 20,
            bb_stddev: 2.0,
            volume_sma_period: 30,
            rsi_fast_buy: 23.0,
            rsi_main_buy: 36.0,
            bb_touch_buffer: 1.01,
            ema_pullback_buffer: 0.985,
            regime_price_floor: 0.95,
            max_breakdown_pct: 0.10,
            enable_short: true,
            rsi_fast_sell: 79.0,
            rsi_main_sell: 62.0,
            bb_reject_buffer: 0.99,
            ema_bounce_buffer: 1.015,
            regime_price_ceiling: 1.05,
            max_breakout_pct: 0.10,
            min_volume_ratio: 0.65,
            stop_loss_atr_mult: 2.4,
            take_profit_atr_mult: 4.0,
            cooldown_candles: 4,
            max_hold_candles: Some(72),
            trade_side: TradeSide::Both,
        }
    }
}

impl RegimeParams {
    /// Candles needed before the first evaluation.
    pub fn warmup(&self) -> usize {
        self.ema_long.max(self.volume_sma_period).max(self.bb_period) + 5
    }
}

/// A complete, validated-on-demand parameter set for one strategy variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum StrategyParams {
    TrendCross(TrendCrossParams),
    RegimeOscillator(RegimeParams),
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams::TrendCross(TrendCrossParams::default())
    }
}

impl StrategyParams {
    pub fn variant(&self) -> StrategyVariant {
        match self {
            StrategyParams::TrendCross(_) => StrategyVariant::TrendCross,
            StrategyParams::RegimeOscillator(_) => StrategyVariant::RegimeOscillator,
        }
    }

    /// Index of the first simulated candle; evaluation needs at least this many candles.
    pub fn warmup(&self) -> usize {
        match self {
            StrategyParams::TrendCross(p) => p.warmup_candles,
            StrategyParams::RegimeOscillator(p) => p.warmup(),
        }
    }

    pub fn stop_loss_atr_mult(&self) -> f64 {
        match self {
            StrategyParams::TrendCross(p) => p.stop_loss_atr_mult,
            StrategyParams::RegimeOscillator(p) => p.stop_loss_atr_mult,
        }
    }

    pub fn take_profit_atr_mult(&self) -> f64 {
        match self {
            StrategyParams::TrendCross(p) => p.take_profit_atr_mult,
            StrategyParams::RegimeOscillator(p) => p.take_profit_atr_mult,
        }
    }

    pub fn cooldown_candles(&self) -> usize {
        match self {
            StrategyParams::TrendCross(p) => p.cooldown_candles,
            StrategyParams::RegimeOscillator(p) => p.cooldown_candles,
        }
    }

    pub fn max_hold_candles(&self) -> Option<usize> {
        match self {
            StrategyParams::TrendCross(p) => p.max_hold_candles,
            StrategyParams::RegimeOscillator(p) => p.max_hold_candles,
        }
    }

    pub fn trade_side(&self) -> TradeSide {
        match self {
            StrategyParams::TrendCross(p) => p.trade_side,
            StrategyParams::RegimeOscillator(p) => p.trade_side,
        }
    }

    pub fn sizing(&self) -> PositionSizing {
        match self {
            StrategyParams::TrendCross(_) => PositionSizing::MaxPosition,
            StrategyParams::RegimeOscillator(_) => PositionSizing::BalanceCapped,
        }
    }

    pub fn exit_fees(&self) -> ExitFees {
        match self {
            StrategyParams::TrendCross(_) => ExitFees::ScaledOnTakeProfit,
            StrategyParams::RegimeOscillator(_) => ExitFees::Scaled,
        }
    }

    /// Check periods, multiples and cooldown.
    pub fn validate(&self) -> Result<(), ParamError> {
        fn period(name: &'static str, value: usize) -> Result<(), ParamError> {
            if value == 0 {
                return Err(ParamError::InvalidPeriod { name, value });
            }
            Ok(())
        }
        fn multiple(name: &'static str, value: f64) -> Result<(), ParamError> {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamError::InvalidMultiple { name, value });
            }
            Ok(())
        }

        match self {
            StrategyParams::TrendCross(p) => {
                period("fast_period", p.fast_period)?;
                period("mid_period", p.mid_period)?;
                period("slow_period", p.slow_period)?;
                period("atr_period", p.atr_period)?;
                period("warmup_candles", p.warmup_candles)?;
            }
            StrategyParams::RegimeOscillator(p) => {
                period("ema_fast", p.ema_fast)?;
                period("ema_trend", p.ema_trend)?;
                period("ema_long", p.ema_long)?;
                period("rsi_fast", p.rsi_fast)?;
                period("rsi_main", p.rsi_main)?;
                period("atr_period", p.atr_period)?;
                period("bb_period", p.bb_period)?;
                period("volume_sma_period", p.volume_sma_period)?;
            }
        }
        multiple("stop_loss_atr_mult", self.stop_loss_atr_mult())?;
        multiple("take_profit_atr_mult", self.take_profit_atr_mult())?;
        if let Some(hold) = self.max_hold_candles() {
            period("max_hold_candles", hold)?;
        }
        if self.cooldown_candles() == 0 {
            return Err(ParamError::ZeroCooldown);
        }
        Ok(())
    }

    /// Return a copy with the given fields replaced.
    ///
    /// Keys must name existing fields of the variant; values are checked by
    /// deserializing the merged set.
    pub fn with_overrides(
        &self,
        overrides: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, ParamError> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(fields) = &mut value {
            for (key, v) in overrides {
                if key == "variant" || !fields.contains_key(key) {
                    return Err(ParamError::UnknownKey {
                        key: key.clone(),
                        variant: self.variant(),
                    });
                }
                fields.insert(key.clone(), v.clone());
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Compact one-line label for logs and tables.
    pub fn label(&self) -> String {
        match self {
            StrategyParams::TrendCross(p) => {
                let mut s = format!(
                    "SL={} TP={} cd={}",
                    p.stop_loss_atr_mult, p.take_profit_atr_mult, p.cooldown_candles
                );
                if p.use_price_filter {
                    s.push_str(" +price");
                }
                if p.min_ema_spread_pct > 0.0 {
                    s.push_str(&format!(" +spread{}%", p.min_ema_spread_pct));
                }
                match p.trade_side {
                    TradeSide::Both => {}
                    TradeSide::LongOnly => s.push_str(" long-only"),
                    TradeSide::ShortOnly => s.push_str(" short-only"),
                }
                s
            }
            StrategyParams::RegimeOscillator(p) => format!(
                "SL={:.1} TP={:.1} RSI-sell={:.0}/{:.0} cd={} hold={}",
                p.stop_loss_atr_mult,
                p.take_profit_atr_mult,
                p.rsi_fast_sell,
                p.rsi_main_sell,
                p.cooldown_candles,
                p.max_hold_candles
                    .map_or_else(|| "-".to_string(), |h| h.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn position_size_caps_and_scales() {
        let acct = AccountConfig::default();
        // balance 100: min(200, 300, 294) = 200
        assert_eq!(acct.position_cap(100.0), 200.0);
        assert_eq!(acct.position_size(PositionSizing::BalanceCapped, 100.0, 0.5), 100.0);
        // balance 1000: capped by max_position_usd
        assert_eq!(acct.position_cap(1000.0), 294.0);
        assert_eq!(acct.position_size(PositionSizing::BalanceCapped, 1000.0, 0.333), 97.9);
        // max-position sizing ignores the balance
        assert_eq!(acct.position_size(PositionSizing::MaxPosition, 100.0, 0.9), 264.6);
        assert_eq!(acct.position_size(PositionSizing::MaxPosition, 5.0, 0.5), 147.0);
    }

    #[test]
    fn trade_side_gating() {
        assert!(TradeSide::Both.allows(Side::Long));
        assert!(TradeSide::Both.allows(Side::Short));
        assert!(TradeSide::LongOnly.allows(Side::Long));
        assert!(!TradeSide::LongOnly.allows(Side::Short));
        assert!(!TradeSide::ShortOnly.allows(Side::Long));
    }

    #[test]
    fn exit_fee_schedules() {
        let fee = 0.00035;
        let flat = ExitFees::ScaledOnTakeProfit.round_trip(ExitReason::StopLoss, 100.0, -0.02, fee);
        assert!((flat - 0.07).abs() < 1e-12);
        let tp = ExitFees::ScaledOnTakeProfit.round_trip(ExitReason::TakeProfit, 100.0, 0.02, fee);
        assert!((tp - (0.035 + 102.0 * fee)).abs() < 1e-12);
        let scaled = ExitFees::Scaled.round_trip(ExitReason::StopLoss, 100.0, -0.02, fee);
        assert!((scaled - (0.035 + 98.0 * fee)).abs() < 1e-12);
    }

    #[test]
    fn regime_warmup_uses_longest_window() {
        assert_eq!(RegimeParams::default().warmup(), 205);
        let p = RegimeParams {
            volume_sma_period: 300,
            ..RegimeParams::default()
        };
        assert_eq!(p.warmup(), 305);
    }

    #[test]
    fn defaults_validate() {
        StrategyParams::default().validate().unwrap();
        StrategyParams::RegimeOscillator(RegimeParams::default())
            .validate()
            .unwrap();
    }

    #[test]
    fn zero_cooldown_rejected() {
        let p = StrategyParams::TrendCross(TrendCrossParams {
            cooldown_candles: 0,
            ..TrendCrossParams::default()
        });
        assert!(matches!(p.validate(), Err(ParamError::ZeroCooldown)));
    }

    #[test]
    fn negative_multiple_rejected() {
        let p = StrategyParams::TrendCross(TrendCrossParams {
            take_profit_atr_mult: -1.0,
            ..TrendCrossParams::default()
        });
        assert!(matches!(
            p.validate(),
            Err(ParamError::InvalidMultiple {
                name: "take_profit_atr_mult",
                ..
            })
        ));
    }

    #[test]
    fn overrides_replace_fields() {
        let base = StrategyParams::default();
        let mut ov = BTreeMap::new();
        ov.insert("stop_loss_atr_mult".to_string(), json!(3.5));
        ov.insert("take_profit_atr_mult".to_string(), json!(2.0));
        let out = base.with_overrides(&ov).unwrap();
        assert_eq!(out.stop_loss_atr_mult(), 3.5);
        assert_eq!(out.take_profit_atr_mult(), 2.0);
        assert_eq!(out.cooldown_candles(), base.cooldown_candles());
    }

    #[test]
    fn overrides_reject_unknown_key() {
        let mut ov = BTreeMap::new();
        ov.insert("rsi_fast_buy".to_string(), json!(21.0));
        let err = StrategyParams::default().with_overrides(&ov).unwrap_err();
        assert!(matches!(err, ParamError::UnknownKey { .. }));
    }

    #[test]
    fn overrides_reject_wrong_type() {
        let mut ov = BTreeMap::new();
        ov.insert("cooldown_candles".to_string(), json!("six"));
        let err = StrategyParams::default().with_overrides(&ov).unwrap_err();
        assert!(matches!(err, ParamError::Override(_)));
    }

    #[test]
    fn toml_roundtrip_with_tag() {
        let src = r#"
variant = "regime_oscillator"
rsi_fast_sell = 83.0
max_hold_candles = 96
"#;
        let p: StrategyParams = toml::from_str(src).unwrap();
        match &p {
            StrategyParams::RegimeOscillator(r) => {
                assert_eq!(r.rsi_fast_sell, 83.0);
                assert_eq!(r.max_hold_candles, Some(96));
                assert_eq!(r.ema_long, 200);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn labels_are_compact() {
        assert_eq!(StrategyParams::default().label(), "SL=3 TP=2.5 cd=6");
        let r = StrategyParams::RegimeOscillator(RegimeParams::default());
        assert_eq!(r.label(), "SL=2.4 TP=4.0 RSI-sell=79/62 cd=4 hold=72");
    }
}
