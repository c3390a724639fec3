//! Signal: the output of one SignalEngine evaluation.
//!
//! An entry carries everything needed to open a position; a hold carries
//! only the reason nothing was opened.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::trade::Side;

/// Trade decision at one evaluation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// A fully specified entry: side, size and protective levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub side: Side,
    /// In [0, 1].
    pub confidence: f64,
    pub size_usd: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub atr: f64,
    /// Net profit fraction at take-profit after round-trip taker fees.
    pub net_profit_pct: f64,
    pub reason: String,
}

/// Entry-condition groups reported when the regime/oscillator variant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCheck {
    Regime,
    Pullback,
    Rsi,
    Volume,
    Breakout,
    Stabilizing,
}

impl fmt::Display for EntryCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryCheck::Regime => "regime",
            EntryCheck::Pullback => "pullback",
            EntryCheck::Rsi => "rsi",
            EntryCheck::Volume => "volume",
            EntryCheck::Breakout => "breakout",
            EntryCheck::Stabilizing => "stabilizing",
        };
        f.write_str(s)
    }
}

/// Why an evaluation produced no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoldReason {
    /// Fewer candles than the longest indicator warm-up.
    InsufficientData { available: usize, required: usize },
    /// ATR is zero or negative: risk cannot be sized.
    ZeroAtr,
    /// Trend/cross variant: no aligned fresh cross on this step.
    NoSetup,
    /// Regime/oscillator variant: the listed check groups failed for both sides.
    NoEntry { failed: Vec<EntryCheck> },
    /// A setup fired but the requested side is disabled.
    SideDisabled { side: Side },
    PositionTooSmall { size_usd: f64, min_order_value: f64 },
    /// Net profit at take-profit is below the required minimum.
    FeeGate { net_profit_pct: f64, min_profit_pct: f64 },
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::InsufficientData {
                available,
                required,
            } => write!(f, "not enough candles ({available} < {required})"),
            HoldReason::ZeroAtr => write!(f, "ATR is zero"),
            HoldReason::NoSetup => write!(f, "no clear signal"),
            HoldReason::NoEntry { failed } => {
                let names: Vec<String> = failed.iter().map(|c| c.to_string()).collect();
                write!(f, "no-entry ({})", names.join(","))
            }
            HoldReason::SideDisabled { side } => write!(f, "{side} entries disabled"),
            HoldReason::PositionTooSmall {
                size_usd,
                min_order_value,
            } => write!(f, "position too small ({size_usd:.2} < {min_order_value:.2})"),
            HoldReason::FeeGate {
                net_profit_pct,
                min_profit_pct,
            } => write!(
                f,
                "net {:.2}% < min {:.2}% after fee",
                net_profit_pct * 100.0,
                min_profit_pct * 100.0
            ),
        }
    }
}

/// Result of evaluating one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Signal {
    Entry(EntrySignal),
    Hold(HoldReason),
}

impl Signal {
    pub fn action(&self) -> Action {
        match self {
            Signal::Entry(e) => match e.side {
                Side::Long => Action::Buy,
                Side::Short => Action::Sell,
            },
            Signal::Hold(_) => Action::Hold,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold(_))
    }

    pub fn entry(&self) -> Option<&EntrySignal> {
        match self {
            Signal::Entry(e) => Some(e),
            Signal::Hold(_) => None,
        }
    }

    pub fn hold_reason(&self) -> Option<&HoldReason> {
        match self {
            Signal::Entry(_) => None,
            Signal::Hold(r) => Some(r),
        }
    }
}
