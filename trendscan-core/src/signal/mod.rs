//! SignalEngine: turns precomputed indicator series into trade decisions.
//!
//! The engine is built once per candle window. `evaluate(i, balance)` only
//! reads indicator values at `i` and `i - 1`, so a simulation over the window
//! and a live evaluation of a truncated window agree at every index.
//!
//! Shared tail for both variants, after the variant produced a setup:
//! ATR > 0 → size = cap(balance) * confidence ≥ min order → SL/TP from ATR →
//! fee gate on the take-profit distance.

pub mod fee_gate;
pub mod regime;
pub mod trend_cross;

pub use fee_gate::{FeeCheck, FeeGate};
pub use regime::RegimeIndicators;
pub use trend_cross::TrendIndicators;

use crate::domain::{Candle, CandleColumns, EntrySignal, HoldReason, Side, Signal};
use crate::params::{AccountConfig, StrategyParams};

/// Side, confidence and description of a setup before sizing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Setup {
    pub side: Side,
    pub confidence: f64,
    pub reason: String,
}

/// Variant-specific indicator cache.
#[derive(Debug, Clone)]
pub enum Indicators {
    TrendCross(TrendIndicators),
    RegimeOscillator(RegimeIndicators),
}

impl Indicators {
    pub fn compute(cols: &CandleColumns, params: &StrategyParams) -> Self {
        match params {
            StrategyParams::TrendCross(p) => Indicators::TrendCross(TrendIndicators::compute(cols, p)),
            StrategyParams::RegimeOscillator(p) => {
                Indicators::RegimeOscillator(RegimeIndicators::compute(cols, p))
            }
        }
    }

    pub fn atr(&self) -> &[f64] {
        match self {
            Indicators::TrendCross(t) => &t.atr,
            Indicators::RegimeOscillator(r) => &r.atr,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    params: StrategyParams,
    account: AccountConfig,
    gate: FeeGate,
    cols: CandleColumns,
    indicators: Indicators,
}

impl SignalEngine {
    pub fn new(params: &StrategyParams, account: &AccountConfig, candles: &[Candle]) -> Self {
        let cols = CandleColumns::from_candles(candles);
        let indicators = Indicators::compute(&cols, params);
        Self {
            params: params.clone(),
            account: *account,
            gate: FeeGate::new(account.taker_fee, account.min_profit_after_fee),
            cols,
            indicators,
        }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Candles required before the first evaluation.
    pub fn required_history(&self) -> usize {
        self.params.warmup().max(2)
    }

    /// Evaluate the most recent candle, as a live loop would.
    pub fn evaluate_latest(&self, balance: f64) -> Signal {
        match self.len() {
            0 => Signal::Hold(HoldReason::InsufficientData {
                available: 0,
                required: self.required_history(),
            }),
            n => self.evaluate(n - 1, balance),
        }
    }

    /// Evaluate candle `index` using only data at or before it.
    pub fn evaluate(&self, index: usize, balance: f64) -> Signal {
        let available = (index + 1).min(self.len());
        let required = self.required_history();
        if index >= self.len() || available < required {
            return Signal::Hold(HoldReason::InsufficientData {
                available,
                required,
            });
        }

        let atr = self.indicators.atr()[index];
        if atr <= 0.0 {
            return Signal::Hold(HoldReason::ZeroAtr);
        }

        let setup = match (&self.indicators, &self.params) {
            (Indicators::TrendCross(ind), StrategyParams::TrendCross(p)) => {
                trend_cross::setup(ind, p, &self.cols.closes, index)
            }
            (Indicators::RegimeOscillator(ind), StrategyParams::RegimeOscillator(p)) => {
                regime::setup(ind, p, &self.cols, index)
            }
            // indicators are always computed from `self.params`
            _ => Err(HoldReason::NoSetup),
        };
        match setup {
            Ok(setup) => self.size_and_gate(setup, index, atr, balance),
            Err(reason) => Signal::Hold(reason),
        }
    }

    fn size_and_gate(&self, setup: Setup, index: usize, atr: f64, balance: f64) -> Signal {
        let size_usd = self.account
            .position_size(self.params.sizing(), balance, setup.confidence);
        if size_usd < self.account.min_order_value {
            return Signal::Hold(HoldReason::PositionTooSmall {
                size_usd,
                min_order_value: self.account.min_order_value,
            });
        }

        let entry_price = self.cols.closes[index];
        let sl_dist = atr * self.params.stop_loss_atr_mult();
        let tp_dist = atr * self.params.take_profit_atr_mult();
        let (stop_loss, take_profit) = match setup.side {
            Side::Long => (entry_price - sl_dist, entry_price + tp_dist),
            Side::Short => (entry_price + sl_dist, entry_price - tp_dist),
        };

        let fees = self.gate.check(size_usd, entry_price, take_profit);
        if !fees.valid {
            return Signal::Hold(HoldReason::FeeGate {
                net_profit_pct: fees.net_profit_pct,
                min_profit_pct: self.gate.min_profit_after_fee,
            });
        }

        Signal::Entry(EntrySignal {
            side: setup.side,
            confidence: setup.confidence,
            size_usd,
            entry_price,
            stop_loss,
            take_profit,
            atr,
            net_profit_pct: fees.net_profit_pct,
            reason: setup.reason,
        })
    }
}
