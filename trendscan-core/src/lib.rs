//! TrendScan Core: candles, indicators, signal engine, position simulator.
//!
//! This crate holds the deterministic part of the system:
//! - Domain types (candles, sides, trades, signals)
//! - Indicator library (EMA, SMA, rolling std, Bollinger, Wilder RSI/ATR)
//! - Strategy parameters and named profiles with per-symbol overrides
//! - SignalEngine with the trend/cross and regime/oscillator variants
//! - PositionSimulator as a fold over explicit step state
//! - Candle collaborators (sources, CSV files, synthetic data) and the
//!   order-execution seam
//!
//! Nothing here performs network I/O or spawns threads.

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod metrics;
pub mod params;
pub mod profile;
pub mod signal;

pub use domain::{Candle, ExitReason, HoldReason, Side, Signal, Trade};
pub use engine::{run_backtest, BacktestError, BacktestResult};
pub use fingerprint::{DatasetHash, ParamKey};
pub use params::{AccountConfig, StrategyParams, StrategyVariant};
pub use profile::{ProfileBook, ProfileError};
pub use signal::SignalEngine;
