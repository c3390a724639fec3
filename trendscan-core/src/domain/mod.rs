//! Domain types for TrendScan

pub mod candle;
pub mod signal;
pub mod trade;

pub use candle::{Candle, CandleColumns};
pub use signal::{Action, EntryCheck, EntrySignal, HoldReason, Signal};
pub use trade::{ExitReason, Side, Trade};

/// Symbol type alias
pub type Symbol = String;
