//! TrendScan Runner: parameter search and out-of-sample validation.
//!
//! This crate builds on `trendscan-core` to provide:
//! - Exhaustive grid search with a parallel/serial switch
//! - Ranking objectives shared by every mode
//! - Stable-candidate selection on held-out data
//! - Train/test and rolling walk-forward validation
//! - Full-sample profile benchmarks
//! - Candle loading with CSV/source/synthetic fallback
//! - Optimisation run configuration (TOML) and CSV/JSON export

pub mod benchmark;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod grid;
pub mod metrics;
pub mod objective;
pub mod runner;
pub mod search;
pub mod stability;
pub mod walk_forward;

pub use benchmark::{benchmark_profiles, BenchmarkRow};
pub use config::{ConfigError, OptimizeConfig, OptimizeMode, RunId};
pub use data_loader::{load_candles, DataOrigin, LoadError, LoadOptions, LoadedCandles};
pub use grid::{ParamGrid, RegimeGrid, TrendGrid};
pub use metrics::RunStats;
pub use objective::Objective;
pub use runner::{
    run_optimization, run_profile_backtest, ModeResult, OptimizationReport, OptimizeError,
    SingleReport,
};
pub use search::{CandidateResult, ParameterSearch, SearchError};
pub use stability::{evaluate_on_test, pick_stable_candidate, TestedCandidate};
pub use train_test::{run_train_test, SplitSpec, TrainTestConfig, TrainTestError, TrainTestReport};
pub use walk_forward::{
    run_walk_forward, split_windows, window_count, CrossWindowRow, FrequencyRow, Recommendation,
    RecommendationSource, WalkForwardConfig, WalkForwardError, WalkForwardReport, WindowSpec,
};
