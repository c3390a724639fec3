//! Simulator state, run results and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EntrySignal, Side, Trade};
use crate::metrics::{max_drawdown_pct, total_return_pct, win_rate_pct};
use crate::params::ParamError;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("insufficient data: {available} candles, need more than {required}")]
    InsufficientData { available: usize, required: usize },
    #[error("invalid strategy parameters")]
    InvalidParams(#[from] ParamError),
}

/// The single live position of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_index: usize,
    pub entry_timestamp: i64,
    pub entry_price: f64,
    pub size_usd: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    pub fn open(signal: &EntrySignal, index: usize, timestamp: i64) -> Self {
        Self {
            side: signal.side,
            entry_index: index,
            entry_timestamp: timestamp,
            entry_price: signal.entry_price,
            size_usd: signal.size_usd,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
        }
    }
}

/// Loop-carried state: one value in, one value out per step.
#[derive(Debug, Clone, PartialEq)]
pub struct SimState {
    pub balance: f64,
    pub position: Option<Position>,
    /// First index at which a new entry may be evaluated.
    pub cooldown_until: usize,
    pub trades: Vec<Trade>,
    pub equity: Vec<f64>,
}

impl SimState {
    pub fn new(initial_capital: f64, expected_steps: usize) -> Self {
        let mut equity = Vec::with_capacity(expected_steps + 1);
        equity.push(initial_capital);
        Self {
            balance: initial_capital,
            position: None,
            cooldown_until: 0,
            trades: Vec::new(),
            equity,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }
}

/// Everything a run produces. Derived once from the final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_balance: f64,
    pub return_pct: f64,
    pub trades: Vec<Trade>,
    /// Realized balance: initial capital, then one point per simulated step.
    pub equity_curve: Vec<f64>,
    /// Percent of trades with pnl > 0.
    pub win_rate: f64,
    pub max_drawdown_pct: f64,
}

impl BacktestResult {
    pub fn from_state(initial_capital: f64, state: SimState) -> Self {
        Self {
            initial_capital,
            final_balance: state.balance,
            return_pct: total_return_pct(initial_capital, state.balance),
            win_rate: win_rate_pct(&state.trades),
            max_drawdown_pct: max_drawdown_pct(&state.equity),
            trades: state.trades,
            equity_curve: state.equity,
        }
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn winning_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }

    pub fn losing_trades(&self) -> usize {
        self.trades.len() - self.winning_trades()
    }
}
