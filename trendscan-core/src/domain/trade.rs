//! Trade: an immutable record of a closed position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// Signed price-change fraction from `entry` to `exit` in this direction.
    pub fn pnl_fraction(self, entry: f64, exit: f64) -> f64 {
        if entry == 0.0 {
            return 0.0;
        }
        self.sign() * (exit - entry) / entry
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeExit,
    /// Forced close at the final candle of the sequence.
    CloseEnd,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::TimeExit => "TIME_EXIT",
            ExitReason::CloseEnd => "CLOSE_END",
        };
        f.write_str(s)
    }
}

/// A closed position: entry to exit, PnL net of fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_timestamp: i64,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_timestamp: i64,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size / PnL ──
    pub size_usd: f64,
    pub fees: f64,
    pub pnl: f64,
    /// Account balance after this trade was realized.
    pub balance: f64,
}

impl Trade {
    /// Net PnL as a fraction of the position notional.
    pub fn return_pct(&self) -> f64 {
        if self.size_usd == 0.0 {
            return 0.0;
        }
        self.pnl / self.size_usd
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn candles_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            side: Side::Long,
            entry_index: 4,
            entry_timestamp: 0,
            entry_price: 100.0,
            exit_index: 8,
            exit_timestamp: 4 * 3_600_000,
            exit_price: 110.0,
            exit_reason: ExitReason::TakeProfit,
            size_usd: 200.0,
            fees: 0.147,
            pnl: 19.853,
            balance: 119.853,
        }
    }

    #[test]
    fn trade_return_pct() {
        let t = sample_trade();
        assert!((t.return_pct() - 19.853 / 200.0).abs() < 1e-12);
    }

    #[test]
    fn trade_is_winner() {
        assert!(sample_trade().is_winner());
        let mut losing = sample_trade();
        losing.pnl = 0.0;
        assert!(!losing.is_winner());
    }

    #[test]
    fn trade_candles_held() {
        assert_eq!(sample_trade().candles_held(), 4);
    }

    #[test]
    fn side_pnl_fraction_is_direction_aware() {
        assert!((Side::Long.pnl_fraction(100.0, 110.0) - 0.1).abs() < 1e-12);
        assert!((Side::Short.pnl_fraction(100.0, 110.0) + 0.1).abs() < 1e-12);
        assert_eq!(Side::Long.pnl_fraction(0.0, 110.0), 0.0);
    }

    #[test]
    fn exit_reason_display_matches_serde() {
        let json = serde_json::to_string(&ExitReason::CloseEnd).unwrap();
        assert_eq!(json, "\"CLOSE_END\"");
        assert_eq!(ExitReason::CloseEnd.to_string(), "CLOSE_END");
    }
}
