//! PositionSimulator: replays candles through the SignalEngine.
//!
//! Per step, in order:
//! 1. In a position: stop-loss, then take-profit (both against high/low),
//!    then max-hold time exit at the close. A losing exit sets a cooldown.
//! 2. Flat and past the cooldown: evaluate the signal; an entry opens at the
//!    close and is not exit-checked on the same step.
//! 3. On the last step, an open position is closed at the final close.
//! 4. Record the realized balance.

pub mod simulator;
pub mod state;

pub use simulator::{run_backtest, step, StepContext};
pub use state::{BacktestError, BacktestResult, Position, SimState};
