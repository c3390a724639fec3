//! Performance metrics: pure functions over a balance curve or trade ledger.
//!
//! Percent values are in percent units (12.5 means 12.5%). Drawdown is
//! reported as a positive magnitude.

use crate::domain::Trade;

/// (final - initial) / initial * 100.
pub fn total_return_pct(initial: f64, final_balance: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_balance - initial) / initial * 100.0
}

/// Share of trades with pnl > 0, in percent. Zero trades gives 0.
pub fn win_rate_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

/// Largest peak-to-trough decline of the curve, in percent of the peak.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak * 100.0);
        }
    }
    max_dd
}

/// Gross profit / gross loss. No losses gives infinity when there are
/// profits and 0 otherwise.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();
    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    trades
        .iter()
        .fold((0usize, 0usize), |(best, run), t| {
            if t.is_winner() {
                (best, 0)
            } else {
                (best.max(run + 1), run + 1)
            }
        })
        .0
}
