//! Run statistics: the compact summary every ranking works on.

use serde::{Deserialize, Serialize};
use trendscan_core::engine::BacktestResult;

/// Return, win rate, trade count and drawdown of one simulation.
///
/// Percent fields use percent units, drawdown is a positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub return_pct: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub max_drawdown_pct: f64,
    pub final_balance: f64,
}

impl RunStats {
    pub fn is_profitable(&self) -> bool {
        self.return_pct > 0.0
    }
}

impl From<&BacktestResult> for RunStats {
    fn from(r: &BacktestResult) -> Self {
        Self {
            return_pct: r.return_pct,
            win_rate: r.win_rate,
            trade_count: r.trade_count(),
            max_drawdown_pct: r.max_drawdown_pct,
            final_balance: r.final_balance,
        }
    }
}

/// Mean of a slice, 0 when empty.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
