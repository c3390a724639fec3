//! Out-of-sample re-evaluation and stable-candidate selection.
//!
//! A candidate chosen on training data is re-simulated on held-out data. The
//! stable pick prefers candidates profitable on both sides with the smallest
//! win-rate gap; otherwise the best test return; otherwise the train-best.

use serde::{Deserialize, Serialize};
use trendscan_core::{Candle, ParamKey, StrategyParams};

use crate::metrics::RunStats;
use crate::objective::{both_positive_key, cmp_keys, sort_best_first, test_return_key, Objective};
use crate::search::{CandidateResult, ParameterSearch};

/// A candidate with its training and test statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestedCandidate {
    pub params: StrategyParams,
    pub key: ParamKey,
    pub train: RunStats,
    pub test: RunStats,
}

impl TestedCandidate {
    pub fn both_positive(&self) -> bool {
        self.train.is_profitable() && self.test.is_profitable()
    }

    pub fn return_gap(&self) -> f64 {
        (self.train.return_pct - self.test.return_pct).abs()
    }

    pub fn win_rate_gap(&self) -> f64 {
        (self.train.win_rate - self.test.win_rate).abs()
    }
}

/// Re-simulate train-ranked candidates on `test` candles, keeping train order.
/// Candidates whose test run fails are dropped.
pub fn evaluate_on_test(
    search: &ParameterSearch,
    test: &[Candle],
    candidates: &[CandidateResult],
) -> Vec<TestedCandidate> {
    candidates
        .iter()
        .filter_map(|c| {
            let t = search.evaluate(test, &c.params).ok()?;
            Some(TestedCandidate {
                params: c.params.clone(),
                key: c.key.clone(),
                train: c.stats,
                test: t.stats,
            })
        })
        .collect()
}

/// Choose the stable candidate from a train-ordered list.
///
/// Only candidates with at least `min_test_trades` test trades are
/// considered; with none, the first (train-best) entry is returned.
pub fn pick_stable_candidate(
    candidates: &[TestedCandidate],
    min_test_trades: usize,
) -> Option<&TestedCandidate> {
    let valid: Vec<&TestedCandidate> = candidates
        .iter()
        .filter(|c| c.test.trade_count >= min_test_trades)
        .collect();

    // earliest wins ties, so the scan keeps the first maximum
    fn best_by<'a>(
        pool: Vec<&'a TestedCandidate>,
        key: fn(&TestedCandidate) -> [f64; 3],
    ) -> Option<&'a TestedCandidate> {
        pool.into_iter().fold(None, |best, c| match best {
            Some(b) if cmp_keys(&key(c), &key(b)).is_le() => Some(b),
            _ => Some(c),
        })
    }

    let both: Vec<&TestedCandidate> = valid.iter().copied().filter(|c| c.both_positive()).collect();
    if !both.is_empty() {
        return best_by(both, both_positive_key);
    }
    if !valid.is_empty() {
        return best_by(valid, test_return_key);
    }
    candidates.first()
}

/// Tested candidates ranked by their test statistics.
pub fn rank_by_test(candidates: &[TestedCandidate], objective: Objective) -> Vec<TestedCandidate> {
    let mut ranked = candidates.to_vec();
    sort_best_first(&mut ranked, |c| objective.stats_key(&c.test));
    ranked
}
