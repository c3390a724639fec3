//! Optimisation runner: wires loading, search, validation and benchmarks.
//!
//! `run_optimization` is the entry point used by the CLI. It resolves the
//! seed and baseline profiles, runs the configured mode and finishes with a
//! full-sample benchmark of the variant's built-in profiles.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use trendscan_core::params::StrategyVariant;
use trendscan_core::{
    run_backtest, BacktestError, BacktestResult, DatasetHash, ProfileBook, ProfileError,
    StrategyParams,
};

use crate::benchmark::{benchmark_profiles, BenchmarkRow};
use crate::config::{ConfigError, OptimizeConfig, OptimizeMode, RunId};
use crate::data_loader::{DataOrigin, LoadedCandles};
use crate::grid::ParamGrid;
use crate::objective::{cmp_keys, Objective};
use crate::search::{CandidateResult, ParameterSearch, SearchError};
use crate::train_test::{run_train_test, TrainTestError, TrainTestReport};
use crate::walk_forward::{run_walk_forward, WalkForwardError, WalkForwardReport};

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
    #[error("profile '{profile}' is {found}, expected {expected}")]
    VariantMismatch {
        profile: String,
        expected: StrategyVariant,
        found: StrategyVariant,
    },
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    TrainTest(#[from] TrainTestError),
    #[error(transparent)]
    WalkForward(#[from] WalkForwardError),
    #[error("backtest failed: {0}")]
    Backtest(#[from] BacktestError),
}

/// Full-sample search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleReport {
    pub evaluated: usize,
    pub valid: usize,
    pub min_trades: usize,
    pub top: Vec<CandidateResult>,
    pub best_by_return: CandidateResult,
    pub best_by_win_rate: CandidateResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeResult {
    Single(SingleReport),
    TrainTest(TrainTestReport),
    WalkForward(WalkForwardReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub run_id: RunId,
    pub symbol: String,
    pub variant: StrategyVariant,
    pub objective: Objective,
    pub candles: usize,
    pub origin: DataOrigin,
    pub dataset_hash: DatasetHash,
    pub seed_profile: String,
    pub baseline_profile: String,
    pub result: ModeResult,
    pub benchmarks: Vec<BenchmarkRow>,
}

impl OptimizationReport {
    /// The parameter set the run recommends.
    pub fn recommended(&self) -> &StrategyParams {
        match &self.result {
            ModeResult::Single(r) => r
                .top
                .first()
                .map_or(&r.best_by_return.params, |c| &c.params),
            ModeResult::TrainTest(r) => r.recommended(),
            ModeResult::WalkForward(r) => &r.recommendation.params,
        }
    }
}

fn resolve_for(
    book: &ProfileBook,
    name: &str,
    symbol: &str,
    variant: StrategyVariant,
) -> Result<StrategyParams, OptimizeError> {
    let params = book.resolve(name, symbol)?;
    if params.variant() != variant {
        return Err(OptimizeError::VariantMismatch {
            profile: name.to_string(),
            expected: variant,
            found: params.variant(),
        });
    }
    Ok(params)
}

/// Run one optimisation as configured.
pub fn run_optimization(
    config: &OptimizeConfig,
    data: &LoadedCandles,
    book: &ProfileBook,
) -> Result<OptimizationReport, OptimizeError> {
    config.validate()?;
    let seed_profile = config.effective_profile(book)?.to_string();
    let baseline_profile = config.effective_baseline(book)?.to_string();
    let base = resolve_for(book, &seed_profile, &data.symbol, config.variant)?;
    let baseline = resolve_for(book, &baseline_profile, &data.symbol, config.variant)?;

    let grid = ParamGrid::default_for(config.variant);
    let search = ParameterSearch::new(config.account).with_parallelism(config.parallel);
    info!(
        symbol = %data.symbol,
        variant = %config.variant,
        mode = %config.mode,
        grid = grid.size(),
        candles = data.candles.len(),
        "optimisation start"
    );

    let result = match config.mode {
        OptimizeMode::Single => ModeResult::Single(run_single(&search, data, &grid, &base, config)?),
        OptimizeMode::TrainTest => ModeResult::TrainTest(run_train_test(
            &search,
            &data.candles,
            &grid,
            &base,
            &config.train_test_config()?,
        )?),
        OptimizeMode::WalkForward => ModeResult::WalkForward(run_walk_forward(
            &search,
            &data.candles,
            &grid,
            &base,
            &baseline,
            &config.walk_forward_config(),
        )?),
    };

    let benchmarks = benchmark_profiles(&data.candles, book, config.variant, &data.symbol, &config.account);

    Ok(OptimizationReport {
        run_id: config.run_id(),
        symbol: data.symbol.clone(),
        variant: config.variant,
        objective: config.objective,
        candles: data.candles.len(),
        origin: data.origin,
        dataset_hash: data.dataset_hash.clone(),
        seed_profile,
        baseline_profile,
        result,
        benchmarks,
    })
}

fn run_single(
    search: &ParameterSearch,
    data: &LoadedCandles,
    grid: &ParamGrid,
    base: &StrategyParams,
    config: &OptimizeConfig,
) -> Result<SingleReport, OptimizeError> {
    let min_trades = config.effective_min_trades();
    let scanned = search.scan(&data.candles, grid, base, config.objective)?;
    let evaluated = scanned.len();
    let valid: Vec<CandidateResult> = scanned
        .into_iter()
        .filter(|r| r.stats.trade_count >= min_trades)
        .collect();

    let best = |objective: Objective| {
        valid
            .iter()
            .min_by(|a, b| cmp_keys(&objective.stats_key(&b.stats), &objective.stats_key(&a.stats)))
            .cloned()
    };
    let (Some(best_by_return), Some(best_by_win_rate)) = (best(Objective::Return), best(Objective::WinRate)) else {
        return Err(SearchError::NoValidConfiguration {
            evaluated,
            min_trades,
        }
        .into());
    };

    info!(evaluated, valid = valid.len(), "single search complete");
    Ok(SingleReport {
        evaluated,
        valid: valid.len(),
        min_trades,
        top: valid.iter().take(config.top).cloned().collect(),
        best_by_return,
        best_by_win_rate,
    })
}

/// Backtest one named profile on loaded candles.
pub fn run_profile_backtest(
    data: &LoadedCandles,
    book: &ProfileBook,
    profile: &str,
    account: &trendscan_core::AccountConfig,
) -> Result<(StrategyParams, BacktestResult), OptimizeError> {
    let params = book.resolve(profile, &data.symbol)?;
    let result = run_backtest(&data.candles, &params, account)?;
    Ok((params, result))
}
