//! The simulation fold and its single-step transition.

use tracing::debug;

use crate::domain::{Candle, ExitReason, Signal, Trade};
use crate::params::{AccountConfig, StrategyParams};
use crate::signal::SignalEngine;

use super::state::{BacktestError, BacktestResult, Position, SimState};

/// Read-only inputs shared by every step of one run.
pub struct StepContext<'a> {
    pub candles: &'a [Candle],
    pub engine: &'a SignalEngine,
    pub params: &'a StrategyParams,
    pub account: &'a AccountConfig,
}

impl StepContext<'_> {
    fn last_index(&self) -> usize {
        self.candles.len().saturating_sub(1)
    }
}

/// Run one strategy over a candle window.
///
/// Simulation starts at the warm-up index; the window must hold more candles
/// than the warm-up.
pub fn run_backtest(
    candles: &[Candle],
    params: &StrategyParams,
    account: &AccountConfig,
) -> Result<BacktestResult, BacktestError> {
    params.validate()?;
    let warmup = params.warmup();
    if candles.len() <= warmup {
        return Err(BacktestError::InsufficientData {
            available: candles.len(),
            required: warmup,
        });
    }

    let engine = SignalEngine::new(params, account, candles);
    let ctx = StepContext {
        candles,
        engine: &engine,
        params,
        account,
    };

    let start = warmup.max(1);
    let initial = SimState::new(account.initial_capital, candles.len() - start);
    let state = (start..candles.len()).fold(initial, |s, i| step(s, &ctx, i));

    let result = BacktestResult::from_state(account.initial_capital, state);
    debug!(
        variant = %params.variant(),
        candles = candles.len(),
        trades = result.trade_count(),
        return_pct = result.return_pct,
        "backtest complete"
    );
    Ok(result)
}

/// One candle of the state machine.
pub fn step(mut state: SimState, ctx: &StepContext<'_>, i: usize) -> SimState {
    let candle = &ctx.candles[i];

    // ─── Exit check ───
    if let Some(pos) = state.position.take() {
        match exit_trigger(&pos, candle, i, ctx.params.max_hold_candles()) {
            Some((reason, price)) => close_position(&mut state, ctx, pos, i, price, reason),
            None => state.position = Some(pos),
        }
    }

    // ─── Entry ───
    if state.is_flat() && i >= state.cooldown_until {
        if let Signal::Entry(entry) = ctx.engine.evaluate(i, state.balance) {
            state.position = Some(Position::open(&entry, i, candle.timestamp));
        }
    }

    // ─── Forced close on the final candle ───
    if i == ctx.last_index() {
        if let Some(pos) = state.position.take() {
            close_position(&mut state, ctx, pos, i, candle.close, ExitReason::CloseEnd);
        }
    }

    state.equity.push(state.balance);
    state
}

/// Stop-loss wins a same-candle tie with take-profit.
fn exit_trigger(
    pos: &Position,
    candle: &Candle,
    i: usize,
    max_hold: Option<usize>,
) -> Option<(ExitReason, f64)> {
    use crate::domain::Side;

    let (stop_hit, target_hit) = match pos.side {
        Side::Long => (candle.low <= pos.stop_loss, candle.high >= pos.take_profit),
        Side::Short => (candle.high >= pos.stop_loss, candle.low <= pos.take_profit),
    };
    if stop_hit {
        return Some((ExitReason::StopLoss, pos.stop_loss));
    }
    if target_hit {
        return Some((ExitReason::TakeProfit, pos.take_profit));
    }
    match max_hold {
        Some(hold) if i.saturating_sub(pos.entry_index) >= hold => {
            Some((ExitReason::TimeExit, candle.close))
        }
        _ => None,
    }
}

fn close_position(
    state: &mut SimState,
    ctx: &StepContext<'_>,
    pos: Position,
    i: usize,
    exit_price: f64,
    reason: ExitReason,
) {
    let pnl_frac = pos.side.pnl_fraction(pos.entry_price, exit_price);
    let fees = ctx
        .params
        .exit_fees()
        .round_trip(reason, pos.size_usd, pnl_frac, ctx.account.taker_fee);
    let pnl = pos.size_usd * pnl_frac - fees;
    state.balance += pnl;

    if pnl < 0.0 {
        state.cooldown_until = i + ctx.params.cooldown_candles();
    }

    state.trades.push(Trade {
        side: pos.side,
        entry_index: pos.entry_index,
        entry_timestamp: pos.entry_timestamp,
        entry_price: pos.entry_price,
        exit_index: i,
        exit_timestamp: ctx.candles[i].timestamp,
        exit_price,
        exit_reason: reason,
        size_usd: pos.size_usd,
        fees,
        pnl,
        balance: state.balance,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::indicators::make_candles;
    use crate::params::{RegimeParams, TrendCrossParams};

    fn candle(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: i * 3_600_000,
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn long_at(entry_index: usize) -> Position {
        Position {
            side: Side::Long,
            entry_index,
            entry_timestamp: 0,
            entry_price: 100.0,
            size_usd: 100.0,
            stop_loss: 95.0,
            take_profit: 110.0,
        }
    }

    #[test]
    fn stop_loss_wins_same_candle_tie() {
        let c = candle(5, 100.0, 111.0, 94.0, 100.0);
        assert_eq!(
            exit_trigger(&long_at(0), &c, 5, None),
            Some((ExitReason::StopLoss, 95.0))
        );
    }

    #[test]
    fn take_profit_at_level() {
        let c = candle(5, 100.0, 111.0, 99.0, 108.0);
        assert_eq!(
            exit_trigger(&long_at(0), &c, 5, None),
            Some((ExitReason::TakeProfit, 110.0))
        );
    }

    #[test]
    fn short_exits_mirror() {
        let pos = Position {
            side: Side::Short,
            stop_loss: 105.0,
            take_profit: 90.0,
            ..long_at(0)
        };
        let up = candle(3, 100.0, 106.0, 99.0, 104.0);
        assert_eq!(exit_trigger(&pos, &up, 3, None), Some((ExitReason::StopLoss, 105.0)));
        let down = candle(3, 100.0, 101.0, 89.0, 92.0);
        assert_eq!(exit_trigger(&pos, &down, 3, None), Some((ExitReason::TakeProfit, 90.0)));
    }

    #[test]
    fn time_exit_after_max_hold() {
        let c = candle(10, 100.0, 101.0, 99.0, 100.5);
        assert_eq!(exit_trigger(&long_at(3), &c, 10, Some(8)), None);
        assert_eq!(
            exit_trigger(&long_at(2), &c, 10, Some(8)),
            Some((ExitReason::TimeExit, 100.5))
        );
    }

    #[test]
    fn too_short_window_is_an_error() {
        let candles = make_candles(&[100.0; 60]);
        let err = run_backtest(&candles, &StrategyParams::default(), &AccountConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData {
                available: 60,
                required: 60
            }
        ));
    }

    #[test]
    fn invalid_params_are_an_error() {
        let candles = make_candles(&[100.0; 100]);
        let params = StrategyParams::TrendCross(TrendCrossParams {
            cooldown_candles: 0,
            ..TrendCrossParams::default()
        });
        assert!(matches!(
            run_backtest(&candles, &params, &AccountConfig::default()),
            Err(BacktestError::InvalidParams(_))
        ));
    }

    #[test]
    fn flat_market_has_no_trades_and_flat_equity() {
        let candles = make_candles(&[100.0; 120]);
        let r = run_backtest(&candles, &StrategyParams::default(), &AccountConfig::default()).unwrap();
        assert!(r.trades.is_empty());
        assert_eq!(r.equity_curve.len(), 120 - 60 + 1);
        assert!(r.equity_curve.iter().all(|&b| b == 100.0));
        assert_eq!(r.final_balance, 100.0);
        assert_eq!(r.win_rate, 0.0);
        assert_eq!(r.max_drawdown_pct, 0.0);
    }

    #[test]
    fn losing_exit_sets_cooldown_past_exit() {
        let candles = make_candles(&[100.0; 10]);
        let engine = SignalEngine::new(&StrategyParams::default(), &AccountConfig::default(), &candles);
        let params = StrategyParams::default();
        let account = AccountConfig::default();
        let ctx = StepContext {
            candles: &candles,
            engine: &engine,
            params: &params,
            account: &account,
        };
        let mut state = SimState::new(100.0, 10);
        state.position = Some(Position {
            stop_loss: 99.5,
            ..long_at(2)
        });
        // make_candles gives low = 99 on a flat series
        let state = step(state, &ctx, 4);
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.trades[0].exit_reason, ExitReason::StopLoss);
        assert!(state.trades[0].pnl < 0.0);
        assert_eq!(state.cooldown_until, 4 + 6);
        assert_eq!(state.equity.len(), 2);
        assert_eq!(*state.equity.last().unwrap(), state.balance);
    }

    #[test]
    fn forced_close_on_last_candle() {
        let candles = make_candles(&[100.0, 100.0, 100.0, 101.0]);
        let engine = SignalEngine::new(&StrategyParams::default(), &AccountConfig::default(), &candles);
        let params = StrategyParams::default();
        let account = AccountConfig::default();
        let ctx = StepContext {
            candles: &candles,
            engine: &engine,
            params: &params,
            account: &account,
        };
        let mut state = SimState::new(100.0, 4);
        state.position = Some(Position {
            stop_loss: 50.0,
            take_profit: 150.0,
            ..long_at(1)
        });
        let state = step(state, &ctx, 3);
        let t = &state.trades[0];
        assert_eq!(t.exit_reason, ExitReason::CloseEnd);
        assert_eq!(t.exit_price, 101.0);
        // trend exits other than take-profit pay a flat 2x fee
        assert!((t.fees - 100.0 * 0.00035 * 2.0).abs() < 1e-12);
        assert!((t.pnl - (1.0 - 0.07)).abs() < 1e-9);
        assert!(state.position.is_none());
    }

    #[test]
    fn regime_exit_fee_scales_with_pnl() {
        let candles = make_candles(&[100.0, 100.0, 100.0, 101.0]);
        let params = StrategyParams::RegimeOscillator(RegimeParams::default());
        let account = AccountConfig::default();
        let engine = SignalEngine::new(&params, &account, &candles);
        let ctx = StepContext {
            candles: &candles,
            engine: &engine,
            params: &params,
            account: &account,
        };
        let mut state = SimState::new(100.0, 4);
        state.position = Some(Position {
            stop_loss: 50.0,
            take_profit: 150.0,
            ..long_at(1)
        });
        let state = step(state, &ctx, 3);
        let t = &state.trades[0];
        assert!((t.fees - (0.035 + 100.0 * 1.01 * 0.00035)).abs() < 1e-12);
    }
}
