//! Exhaustive parameter search.
//!
//! Every grid combination is simulated on the same candles, optionally in
//! parallel. Results are ranked best first by an [`Objective`]; combinations
//! whose simulation fails are skipped rather than aborting the search.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use trendscan_core::engine::{run_backtest, BacktestError};
use trendscan_core::params::{AccountConfig, StrategyParams, StrategyVariant};
use trendscan_core::{Candle, ParamKey};

use crate::grid::ParamGrid;
use crate::metrics::RunStats;
use crate::objective::{sort_best_first, Objective};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no configuration among {evaluated} reached {min_trades} trades")]
    NoValidConfiguration { evaluated: usize, min_trades: usize },
    #[error("not enough candles to search: {0}")]
    InsufficientData(#[source] BacktestError),
    #[error("grid is for {grid} but base parameters are {base}")]
    VariantMismatch {
        grid: StrategyVariant,
        base: StrategyVariant,
    },
    #[error("parameter grid is empty")]
    EmptyGrid,
}

/// One simulated combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: StrategyParams,
    pub key: ParamKey,
    pub stats: RunStats,
}

impl CandidateResult {
    pub fn label(&self) -> String {
        self.params.label()
    }
}

/// Grid search executor.
#[derive(Debug, Clone)]
pub struct ParameterSearch {
    account: AccountConfig,
    parallel: bool,
}

impl ParameterSearch {
    pub fn new(account: AccountConfig) -> Self {
        Self {
            account,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution. Output is identical either way.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn account(&self) -> &AccountConfig {
        &self.account
    }

    /// Simulate one parameter set.
    pub fn evaluate(
        &self,
        candles: &[Candle],
        params: &StrategyParams,
    ) -> Result<CandidateResult, BacktestError> {
        let result = run_backtest(candles, params, &self.account)?;
        Ok(CandidateResult {
            params: params.clone(),
            key: ParamKey::of(params),
            stats: RunStats::from(&result),
        })
    }

    /// Simulate every combination and rank, without a trade-count filter.
    ///
    /// Fails with `InsufficientData` only when every combination failed
    /// for lack of candles.
    pub fn scan(
        &self,
        candles: &[Candle],
        grid: &ParamGrid,
        base: &StrategyParams,
        objective: Objective,
    ) -> Result<Vec<CandidateResult>, SearchError> {
        let combos = grid.generate(base)?;

        let outcomes: Vec<Result<CandidateResult, BacktestError>> = if self.parallel {
            combos.par_iter().map(|p| self.evaluate(candles, p)).collect()
        } else {
            combos.iter().map(|p| self.evaluate(candles, p)).collect()
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(r) => results.push(r),
                Err(e) => {
                    debug!(error = %e, "skipping combination");
                    first_error.get_or_insert(e);
                }
            }
        }

        if results.is_empty() {
            if let Some(e) = first_error {
                return Err(SearchError::InsufficientData(e));
            }
        }

        sort_best_first(&mut results, |r| objective.stats_key(&r.stats));
        Ok(results)
    }

    /// Ranked combinations with at least `min_trades` trades.
    pub fn search(
        &self,
        candles: &[Candle],
        grid: &ParamGrid,
        base: &StrategyParams,
        objective: Objective,
        min_trades: usize,
    ) -> Result<Vec<CandidateResult>, SearchError> {
        let scanned = self.scan(candles, grid, base, objective)?;
        let evaluated = scanned.len();
        let valid: Vec<CandidateResult> = scanned
            .into_iter()
            .filter(|r| r.stats.trade_count >= min_trades)
            .collect();

        info!(
            evaluated,
            valid = valid.len(),
            min_trades,
            objective = %objective,
            "search complete"
        );

        if valid.is_empty() {
            return Err(SearchError::NoValidConfiguration {
                evaluated,
                min_trades,
            });
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TrendGrid;
    use trendscan_core::data::{synthetic_candles, Interval};

    fn small_grid() -> ParamGrid {
        ParamGrid::TrendCross(TrendGrid {
            stop_loss_atr_mult: vec![2.0, 3.0],
            take_profit_atr_mult: vec![2.0, 3.0],
            cooldown_candles: vec![1, 4],
            ..TrendGrid::default()
        })
    }

    #[test]
    fn results_are_ranked_and_filtered() {
        let candles = synthetic_candles("BTC", 0, 2000, Interval::H1);
        let search = ParameterSearch::new(AccountConfig::default()).with_parallelism(false);
        let all = search
            .scan(&candles, &small_grid(), &StrategyParams::default(), Objective::Return)
            .unwrap();
        assert_eq!(all.len(), 8);
        for pair in all.windows(2) {
            assert!(pair[0].stats.return_pct >= pair[1].stats.return_pct);
        }

        let min_trades = all.iter().map(|r| r.stats.trade_count).min().unwrap_or(0) + 1;
        match search.search(&candles, &small_grid(), &StrategyParams::default(), Objective::Return, min_trades) {
            Ok(valid) => assert!(valid.iter().all(|r| r.stats.trade_count >= min_trades)),
            Err(SearchError::NoValidConfiguration { evaluated, .. }) => assert_eq!(evaluated, 8),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn impossible_threshold_reports_no_valid_configuration() {
        let candles = synthetic_candles("ETH", 0, 800, Interval::H1);
        let search = ParameterSearch::new(AccountConfig::default());
        let err = search
            .search(&candles, &small_grid(), &StrategyParams::default(), Objective::WinRate, 100_000)
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::NoValidConfiguration { evaluated: 8, min_trades: 100_000 }
        ));
    }

    #[test]
    fn too_few_candles_reports_insufficient_data() {
        let candles = synthetic_candles("ETH", 0, 50, Interval::H1);
        let search = ParameterSearch::new(AccountConfig::default());
        let err = search
            .scan(&candles, &small_grid(), &StrategyParams::default(), Objective::WinRate)
            .unwrap_err();
        assert!(matches!(err, SearchError::InsufficientData(_)));
    }

    #[test]
    fn evaluate_keys_by_params() {
        let candles = synthetic_candles("SOL", 0, 600, Interval::H1);
        let search = ParameterSearch::new(AccountConfig::default());
        let params = StrategyParams::default();
        let r = search.evaluate(&candles, &params).unwrap();
        assert_eq!(r.key, ParamKey::of(&params));
        assert_eq!(r.label(), params.label());
    }
}
