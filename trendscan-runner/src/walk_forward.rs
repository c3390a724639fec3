//! Rolling walk-forward validation.
//!
//! Window k trains on `[k·step, k·step + train_len)` and tests on the
//! following `test_len` candles. Each window searches its training slice,
//! re-runs the top candidates on its test slice and picks a stable candidate.
//!
//! The recommendation is chosen in order of preference:
//! 1. cross-window re-validation: every distinct candidate seen in any window
//!    (plus the baseline) is re-run on the test slice of every valid window
//!    and ranked;
//! 2. frequency aggregation of the per-window stable picks, when no
//!    candidate survives re-validation;
//! 3. the baseline, when it matches or beats the selection on positive-window
//!    rate, average test win rate and average test return.
//!
//! Window count for N candles: `floor((N − T − S) / P) + 1` when N ≥ T + S.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info};

use trendscan_core::{Candle, ParamKey, StrategyParams};

use crate::grid::ParamGrid;
use crate::metrics::{mean, RunStats};
use crate::objective::{sort_best_first, Objective};
use crate::search::{ParameterSearch, SearchError};
use crate::stability::{evaluate_on_test, pick_stable_candidate, rank_by_test, TestedCandidate};

// ─── Configuration ───────────────────────────────────────────────────

/// Walk-forward sizes are in candles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub train_len: usize,
    pub test_len: usize,
    pub step: usize,
    pub min_windows: usize,
    pub min_trades: usize,
    pub candidate_top: usize,
    pub objective: Objective,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        // 90 / 21 / 21 days of hourly candles
        Self {
            train_len: 90 * 24,
            test_len: 21 * 24,
            step: 21 * 24,
            min_windows: 2,
            min_trades: 20,
            candidate_top: 20,
            objective: Objective::default(),
        }
    }
}

impl WalkForwardConfig {
    pub fn min_test_trades(&self) -> usize {
        (self.min_trades / 3).max(4)
    }

    fn required_windows(&self) -> usize {
        self.min_windows.max(1)
    }
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("invalid window sizes: train {train_len}, test {test_len}, step {step} (all must be > 0)")]
    InvalidSizes {
        train_len: usize,
        test_len: usize,
        step: usize,
    },
    #[error("only {available} walk-forward windows fit the data, need {required}")]
    InsufficientWindows { available: usize, required: usize },
    #[error("only {valid} windows produced a candidate, need {required}")]
    InsufficientValidWindows { valid: usize, required: usize },
    #[error("window search failed: {0}")]
    Search(#[from] SearchError),
}

// ─── Window splitting ────────────────────────────────────────────────

/// Number of windows that fit `n` candles.
pub fn window_count(n: usize, train_len: usize, test_len: usize, step: usize) -> usize {
    if step == 0 || n < train_len + test_len {
        return 0;
    }
    (n - train_len - test_len) / step + 1
}

/// Candle index ranges of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

impl WindowSpec {
    pub fn train(&self) -> Range<usize> {
        self.train_start..self.train_end
    }

    pub fn test(&self) -> Range<usize> {
        self.test_start..self.test_end
    }
}

/// Split `n` candles into windows, failing when fewer than `min_windows` fit.
pub fn split_windows(n: usize, config: &WalkForwardConfig) -> Result<Vec<WindowSpec>, WalkForwardError> {
    let (t, s, p) = (config.train_len, config.test_len, config.step);
    if t == 0 || s == 0 || p == 0 {
        return Err(WalkForwardError::InvalidSizes {
            train_len: t,
            test_len: s,
            step: p,
        });
    }

    let count = window_count(n, t, s, p);
    let required = config.required_windows();
    if count < required {
        return Err(WalkForwardError::InsufficientWindows {
            available: count,
            required,
        });
    }

    Ok((0..count)
        .map(|k| {
            let start = k * p;
            WindowSpec {
                index: k,
                train_start: start,
                train_end: start + t,
                test_start: start + t,
                test_end: start + t + s,
            }
        })
        .collect())
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No training candidate reached the trade threshold.
    NoTrainCandidates { min_trades: usize },
    /// Training slice shorter than the strategy warm-up.
    InsufficientTrainData,
    /// No training candidate could be evaluated on the test slice.
    NoTestResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedWindow {
    pub window: WindowSpec,
    pub reason: SkipReason,
}

/// Outcome of one successful window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub window: WindowSpec,
    pub train_valid: usize,
    pub candidates: Vec<TestedCandidate>,
    pub stable: TestedCandidate,
    pub test_best: TestedCandidate,
}

/// Per-window stable picks grouped by parameter identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRow {
    pub params: StrategyParams,
    pub key: ParamKey,
    pub count: usize,
    pub avg_test_return: f64,
    pub avg_test_win_rate: f64,
    pub avg_test_trades: f64,
    pub avg_test_drawdown: f64,
    pub positive_rate: f64,
    pub avg_ret_gap: f64,
    pub avg_wr_gap: f64,
}

/// One candidate re-run on every test window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossWindowRow {
    pub params: StrategyParams,
    pub key: ParamKey,
    pub windows: usize,
    pub avg_test_return: f64,
    pub avg_test_win_rate: f64,
    pub avg_test_trades: f64,
    pub avg_test_drawdown: f64,
    pub positive_rate: f64,
    pub worst_test_return: f64,
}

impl CrossWindowRow {
    fn from_runs(params: StrategyParams, key: ParamKey, runs: &[RunStats]) -> Self {
        let returns: Vec<f64> = runs.iter().map(|r| r.return_pct).collect();
        let win_rates: Vec<f64> = runs.iter().map(|r| r.win_rate).collect();
        let trades: Vec<f64> = runs.iter().map(|r| r.trade_count as f64).collect();
        let drawdowns: Vec<f64> = runs.iter().map(|r| r.max_drawdown_pct).collect();
        let positive = returns.iter().filter(|&&r| r > 0.0).count();
        Self {
            params,
            key,
            windows: runs.len(),
            avg_test_return: mean(&returns),
            avg_test_win_rate: mean(&win_rates),
            avg_test_trades: mean(&trades),
            avg_test_drawdown: mean(&drawdowns),
            positive_rate: if runs.is_empty() { 0.0 } else { positive as f64 / runs.len() as f64 },
            worst_test_return: returns.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    CrossWindow,
    Frequency,
    BaselineGuard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub params: StrategyParams,
    pub key: ParamKey,
    pub source: RecommendationSource,
    pub positive_rate: f64,
    pub avg_test_return: f64,
    pub avg_test_win_rate: f64,
}

/// Averages of the per-window stable picks, as if re-optimised every window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSummary {
    pub windows: usize,
    pub avg_test_return: f64,
    pub avg_test_win_rate: f64,
    pub positive_windows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub config: WalkForwardConfig,
    pub windows: Vec<WindowSpec>,
    pub results: Vec<WindowResult>,
    pub skipped: Vec<SkippedWindow>,
    pub frequency: Vec<FrequencyRow>,
    pub cross_window: Vec<CrossWindowRow>,
    /// Baseline re-run on the valid test windows.
    pub baseline: Option<CrossWindowRow>,
    pub adaptive: AdaptiveSummary,
    pub recommendation: Recommendation,
}

// ─── Candidate pool ──────────────────────────────────────────────────

/// Distinct candidates in first-seen order.
#[derive(Debug, Default)]
struct CandidatePool {
    order: Vec<(ParamKey, StrategyParams)>,
    seen: HashSet<ParamKey>,
}

impl CandidatePool {
    fn insert(&mut self, key: &ParamKey, params: &StrategyParams) {
        if self.seen.insert(key.clone()) {
            self.order.push((key.clone(), params.clone()));
        }
    }
}

// ─── Validation ──────────────────────────────────────────────────────

/// Run walk-forward validation over `candles`.
///
/// `base` seeds the grid; `baseline` is the fixed parameter set used as the
/// floor guard and always joins the cross-window pool.
pub fn run_walk_forward(
    search: &ParameterSearch,
    candles: &[Candle],
    grid: &ParamGrid,
    base: &StrategyParams,
    baseline: &StrategyParams,
    config: &WalkForwardConfig,
) -> Result<WalkForwardReport, WalkForwardError> {
    let windows = split_windows(candles.len(), config)?;
    let min_test_trades = config.min_test_trades();
    info!(
        windows = windows.len(),
        train_len = config.train_len,
        test_len = config.test_len,
        step = config.step,
        "walk-forward start"
    );

    let baseline_key = ParamKey::of(baseline);
    let mut pool = CandidatePool::default();
    pool.insert(&baseline_key, baseline);

    let mut results = Vec::new();
    let mut skipped = Vec::new();

    for win in &windows {
        let train = &candles[win.train()];
        let test = &candles[win.test()];

        let ranked = match search.search(train, grid, base, config.objective, config.min_trades) {
            Ok(r) => r,
            Err(SearchError::NoValidConfiguration { .. }) => {
                skip(&mut skipped, win, SkipReason::NoTrainCandidates { min_trades: config.min_trades });
                continue;
            }
            Err(SearchError::InsufficientData(_)) => {
                skip(&mut skipped, win, SkipReason::InsufficientTrainData);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let top = &ranked[..ranked.len().min(config.candidate_top.max(1))];
        for c in top {
            pool.insert(&c.key, &c.params);
        }

        let candidates = evaluate_on_test(search, test, top);
        let Some(stable) = pick_stable_candidate(&candidates, min_test_trades).cloned() else {
            skip(&mut skipped, win, SkipReason::NoTestResults);
            continue;
        };
        let Some(test_best) = rank_by_test(&candidates, config.objective).into_iter().next() else {
            skip(&mut skipped, win, SkipReason::NoTestResults);
            continue;
        };

        debug!(
            window = win.index,
            train_valid = ranked.len(),
            stable = %stable.params.label(),
            test_return = stable.test.return_pct,
            "window complete"
        );
        results.push(WindowResult {
            window: *win,
            train_valid: ranked.len(),
            candidates,
            stable,
            test_best,
        });
    }

    let required = config.required_windows();
    if results.len() < required {
        return Err(WalkForwardError::InsufficientValidWindows {
            valid: results.len(),
            required,
        });
    }

    let frequency = frequency_rows(&results, config.objective);
    let test_slices: Vec<&[Candle]> = results.iter().map(|r| &candles[r.window.test()]).collect();

    // skipped windows contribute no test slice
    let cross_window = cross_window_rows(search, &pool, &test_slices, config.objective);

    let baseline_row = cross_window
        .iter()
        .find(|r| r.key == baseline_key)
        .cloned()
        .or_else(|| cross_validate(search, &baseline_key, baseline, &test_slices));

    let selected = select(&cross_window, &frequency)?;
    let recommendation = match &baseline_row {
        Some(b) if b.key != selected.key && dominates(b, &selected) => {
            info!(baseline = %baseline.label(), "baseline guard replaces selection");
            Recommendation {
                params: b.params.clone(),
                key: b.key.clone(),
                source: RecommendationSource::BaselineGuard,
                positive_rate: b.positive_rate,
                avg_test_return: b.avg_test_return,
                avg_test_win_rate: b.avg_test_win_rate,
            }
        }
        _ => selected,
    };

    let stable_returns: Vec<f64> = results.iter().map(|r| r.stable.test.return_pct).collect();
    let stable_win_rates: Vec<f64> = results.iter().map(|r| r.stable.test.win_rate).collect();
    let adaptive = AdaptiveSummary {
        windows: results.len(),
        avg_test_return: mean(&stable_returns),
        avg_test_win_rate: mean(&stable_win_rates),
        positive_windows: stable_returns.iter().filter(|&&r| r > 0.0).count(),
    };

    info!(
        valid = results.len(),
        skipped = skipped.len(),
        source = ?recommendation.source,
        params = %recommendation.params.label(),
        "walk-forward complete"
    );

    Ok(WalkForwardReport {
        config: *config,
        windows,
        results,
        skipped,
        frequency,
        cross_window,
        baseline: baseline_row,
        adaptive,
        recommendation,
    })
}

fn skip(skipped: &mut Vec<SkippedWindow>, win: &WindowSpec, reason: SkipReason) {
    info!(window = win.index, ?reason, "window skipped");
    skipped.push(SkippedWindow {
        window: *win,
        reason,
    });
}

/// Group stable picks by key, first-seen order, then rank.
pub fn frequency_rows(results: &[WindowResult], objective: Objective) -> Vec<FrequencyRow> {
    let mut order: Vec<ParamKey> = Vec::new();
    let mut groups: HashMap<ParamKey, Vec<&TestedCandidate>> = HashMap::new();
    for r in results {
        let entry = groups.entry(r.stable.key.clone()).or_default();
        if entry.is_empty() {
            order.push(r.stable.key.clone());
        }
        entry.push(&r.stable);
    }

    let mut rows: Vec<FrequencyRow> = order
        .into_iter()
        .filter_map(|key| {
            let picks = groups.remove(&key)?;
            let first = picks.first()?;
            let avg = |f: fn(&TestedCandidate) -> f64| mean(&picks.iter().map(|c| f(c)).collect::<Vec<_>>());
            let positive = picks.iter().filter(|c| c.test.return_pct > 0.0).count();
            Some(FrequencyRow {
                params: first.params.clone(),
                count: picks.len(),
                avg_test_return: avg(|c| c.test.return_pct),
                avg_test_win_rate: avg(|c| c.test.win_rate),
                avg_test_trades: avg(|c| c.test.trade_count as f64),
                avg_test_drawdown: avg(|c| c.test.max_drawdown_pct),
                positive_rate: positive as f64 / picks.len() as f64,
                avg_ret_gap: avg(TestedCandidate::return_gap),
                avg_wr_gap: avg(TestedCandidate::win_rate_gap),
                key,
            })
        })
        .collect();

    sort_best_first(&mut rows, |r| objective.frequency_key(r));
    rows
}

fn cross_validate(
    search: &ParameterSearch,
    key: &ParamKey,
    params: &StrategyParams,
    tests: &[&[Candle]],
) -> Option<CrossWindowRow> {
    let runs = tests
        .iter()
        .map(|t| search.evaluate(t, params).map(|r| r.stats))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    Some(CrossWindowRow::from_runs(params.clone(), key.clone(), &runs))
}

/// Re-run every pooled candidate on all test slices; candidates that fail on
/// any slice are dropped.
fn cross_window_rows(
    search: &ParameterSearch,
    pool: &CandidatePool,
    tests: &[&[Candle]],
    objective: Objective,
) -> Vec<CrossWindowRow> {
    let run = |(key, params): &(ParamKey, StrategyParams)| cross_validate(search, key, params, tests);
    let mut rows: Vec<CrossWindowRow> = if search.is_parallel() {
        pool.order.par_iter().filter_map(run).collect()
    } else {
        pool.order.iter().filter_map(run).collect()
    };
    debug!(pool = pool.order.len(), rows = rows.len(), "cross-window re-validation");
    sort_best_first(&mut rows, |r| objective.cross_window_key(r));
    rows
}

fn select(cross: &[CrossWindowRow], frequency: &[FrequencyRow]) -> Result<Recommendation, WalkForwardError> {
    if let Some(r) = cross.first() {
        return Ok(Recommendation {
            params: r.params.clone(),
            key: r.key.clone(),
            source: RecommendationSource::CrossWindow,
            positive_rate: r.positive_rate,
            avg_test_return: r.avg_test_return,
            avg_test_win_rate: r.avg_test_win_rate,
        });
    }
    frequency
        .first()
        .map(|r| Recommendation {
            params: r.params.clone(),
            key: r.key.clone(),
            source: RecommendationSource::Frequency,
            positive_rate: r.positive_rate,
            avg_test_return: r.avg_test_return,
            avg_test_win_rate: r.avg_test_win_rate,
        })
        .ok_or(WalkForwardError::InsufficientValidWindows {
            valid: 0,
            required: 1,
        })
}

/// Baseline is at least as good on every tracked metric.
fn dominates(baseline: &CrossWindowRow, selected: &Recommendation) -> bool {
    baseline.positive_rate >= selected.positive_rate
        && baseline.avg_test_win_rate >= selected.avg_test_win_rate
        && baseline.avg_test_return >= selected.avg_test_return
}
