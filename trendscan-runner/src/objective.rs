//! Ranking objectives: every ordering used by search and validation.
//!
//! Each ordering is a key vector compared lexicographically, larger first.
//! NaN components compare equal so a degenerate metric never panics a sort.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::metrics::RunStats;
use crate::stability::TestedCandidate;
use crate::walk_forward::{CrossWindowRow, FrequencyRow};

/// Which metric leads the ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    WinRate,
    Return,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::WinRate => f.write_str("win_rate"),
            Objective::Return => f.write_str("return"),
        }
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win_rate" | "win-rate" => Ok(Objective::WinRate),
            "return" => Ok(Objective::Return),
            other => Err(format!("unknown objective '{other}' (expected win_rate or return)")),
        }
    }
}

/// Lexicographic comparison of two key vectors.
pub fn cmp_keys(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.partial_cmp(y).unwrap_or(Ordering::Equal) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Stable sort, best first.
pub fn sort_best_first<T, const N: usize>(items: &mut [T], key: impl Fn(&T) -> [f64; N]) {
    items.sort_by(|a, b| cmp_keys(&key(b), &key(a)));
}

impl Objective {
    fn lead(self, return_pct: f64, win_rate: f64) -> (f64, f64) {
        match self {
            Objective::WinRate => (win_rate, return_pct),
            Objective::Return => (return_pct, win_rate),
        }
    }

    /// (primary, secondary, -drawdown).
    pub fn stats_key(self, s: &RunStats) -> [f64; 3] {
        let (p, q) = self.lead(s.return_pct, s.win_rate);
        [p, q, -s.max_drawdown_pct]
    }

    /// Ordering of per-window stable picks aggregated by frequency.
    pub fn frequency_key(self, r: &FrequencyRow) -> [f64; 5] {
        let (p, q) = self.lead(r.avg_test_return, r.avg_test_win_rate);
        let gap = match self {
            Objective::WinRate => r.avg_wr_gap,
            Objective::Return => r.avg_ret_gap,
        };
        [r.count as f64, r.positive_rate, p, q, -gap]
    }

    /// Ordering of candidates re-run on every test window.
    pub fn cross_window_key(self, r: &CrossWindowRow) -> [f64; 5] {
        let (p, q) = self.lead(r.avg_test_return, r.avg_test_win_rate);
        [r.positive_rate, p, q, r.worst_test_return, -r.avg_test_drawdown]
    }
}

/// Stable pick among candidates profitable on both train and test:
/// (min(train, test) return, test win rate, -|train wr - test wr|).
pub fn both_positive_key(c: &TestedCandidate) -> [f64; 3] {
    [
        c.train.return_pct.min(c.test.return_pct),
        c.test.win_rate,
        -(c.train.win_rate - c.test.win_rate).abs(),
    ]
}

/// Stable pick when none is profitable on both:
/// (test return, test win rate, -|train ret - test ret|).
pub fn test_return_key(c: &TestedCandidate) -> [f64; 3] {
    [
        c.test.return_pct,
        c.test.win_rate,
        -(c.train.return_pct - c.test.return_pct).abs(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(ret: f64, wr: f64, dd: f64) -> RunStats {
        RunStats {
            return_pct: ret,
            win_rate: wr,
            trade_count: 10,
            max_drawdown_pct: dd,
            final_balance: 100.0 + ret,
        }
    }

    #[test]
    fn lexicographic_with_nan() {
        assert_eq!(cmp_keys(&[1.0, 2.0], &[1.0, 3.0]), Ordering::Less);
        assert_eq!(cmp_keys(&[2.0, 0.0], &[1.0, 9.0]), Ordering::Greater);
        assert_eq!(cmp_keys(&[f64::NAN, 1.0], &[0.0, 0.5]), Ordering::Greater);
        assert_eq!(cmp_keys(&[], &[]), Ordering::Equal);
    }

    #[test]
    fn win_rate_objective_leads_with_win_rate() {
        let mut rows = vec![stats(10.0, 50.0, 5.0), stats(2.0, 70.0, 5.0), stats(5.0, 70.0, 5.0)];
        sort_best_first(&mut rows, |s| Objective::WinRate.stats_key(s));
        assert_eq!(rows[0].return_pct, 5.0);
        assert_eq!(rows[1].return_pct, 2.0);
        assert_eq!(rows[2].return_pct, 10.0);
    }

    #[test]
    fn return_objective_breaks_ties_by_drawdown() {
        let mut rows = vec![stats(5.0, 60.0, 9.0), stats(5.0, 60.0, 3.0), stats(8.0, 10.0, 30.0)];
        sort_best_first(&mut rows, |s| Objective::Return.stats_key(s));
        assert_eq!(rows[0].return_pct, 8.0);
        assert_eq!(rows[1].max_drawdown_pct, 3.0);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut rows = vec![(1, stats(1.0, 1.0, 1.0)), (2, stats(1.0, 1.0, 1.0))];
        sort_best_first(&mut rows, |(_, s)| Objective::Return.stats_key(s));
        assert_eq!(rows[0].0, 1);
    }

    #[test]
    fn objective_parsing() {
        assert_eq!("win-rate".parse::<Objective>().unwrap(), Objective::WinRate);
        assert_eq!("return".parse::<Objective>().unwrap(), Objective::Return);
        assert!("sharpe".parse::<Objective>().is_err());
    }
}
