//! Serializable optimisation run configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use trendscan_core::data::Interval;
use trendscan_core::params::{AccountConfig, StrategyVariant};
use trendscan_core::{ProfileBook, ProfileError};

use crate::objective::Objective;
use crate::train_test::{SplitSpec, TrainTestConfig};
use crate::walk_forward::WalkForwardConfig;

/// Unique identifier for an optimisation run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeMode {
    Single,
    TrainTest,
    #[default]
    WalkForward,
}

impl fmt::Display for OptimizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptimizeMode::Single => "single",
            OptimizeMode::TrainTest => "train_test",
            OptimizeMode::WalkForward => "walk_forward",
        })
    }
}

impl FromStr for OptimizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "single" => Ok(OptimizeMode::Single),
            "train_test" => Ok(OptimizeMode::TrainTest),
            "walk_forward" => Ok(OptimizeMode::WalkForward),
            other => Err(format!(
                "unknown mode '{other}' (expected single, train-test or walk-forward)"
            )),
        }
    }
}

/// Everything needed to reproduce an optimisation run.
///
/// Optional fields fall back to per-variant defaults through the
/// `effective_*` accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub symbol: String,
    pub variant: StrategyVariant,
    pub mode: OptimizeMode,
    pub objective: Objective,
    pub min_trades: Option<usize>,
    /// Rows reported in single mode.
    pub top: usize,
    pub candidate_top: Option<usize>,
    pub train_ratio: f64,
    /// Overrides `train_ratio` when set.
    pub train_end: Option<NaiveDate>,
    pub interval: Interval,
    pub wf_train_days: usize,
    pub wf_test_days: usize,
    pub wf_step_days: usize,
    pub wf_min_windows: Option<usize>,
    /// Profile whose parameters seed the grid; defaults to the variant baseline.
    pub profile: Option<String>,
    /// Baseline guard profile; defaults to the variant baseline.
    pub baseline_profile: Option<String>,
    pub parallel: bool,
    pub account: AccountConfig,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC".to_string(),
            variant: StrategyVariant::TrendCross,
            mode: OptimizeMode::default(),
            objective: Objective::default(),
            min_trades: None,
            top: 10,
            candidate_top: None,
            train_ratio: 0.7,
            train_end: None,
            interval: Interval::H1,
            wf_train_days: 90,
            wf_test_days: 21,
            wf_step_days: 21,
            wf_min_windows: None,
            profile: None,
            baseline_profile: None,
            parallel: true,
            account: AccountConfig::default(),
        }
    }
}

impl OptimizeConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.symbol.trim().is_empty() {
            return invalid("symbol", "must not be empty");
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return invalid("train_ratio", "must be strictly between 0 and 1");
        }
        if self.top == 0 {
            return invalid("top", "must be at least 1");
        }
        if self.candidate_top == Some(0) {
            return invalid("candidate_top", "must be at least 1");
        }
        if self.wf_train_days == 0 || self.wf_test_days == 0 || self.wf_step_days == 0 {
            return invalid("wf_*_days", "walk-forward sizes must be positive");
        }
        if self.account.initial_capital <= 0.0 {
            return invalid("account.initial_capital", "must be positive");
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn effective_min_trades(&self) -> usize {
        self.min_trades.unwrap_or(match self.variant {
            StrategyVariant::TrendCross => 20,
            StrategyVariant::RegimeOscillator => 3,
        })
    }

    pub fn effective_candidate_top(&self) -> usize {
        self.candidate_top.unwrap_or(match self.variant {
            StrategyVariant::TrendCross => 20,
            StrategyVariant::RegimeOscillator => 25,
        })
    }

    pub fn effective_min_windows(&self) -> usize {
        self.wf_min_windows.unwrap_or(match self.variant {
            StrategyVariant::TrendCross => 2,
            StrategyVariant::RegimeOscillator => 3,
        })
    }

    pub fn effective_profile<'a>(&'a self, book: &'a ProfileBook) -> Result<&'a str, ConfigError> {
        match &self.profile {
            Some(p) => Ok(p.as_str()),
            None => Ok(book.baseline_for(self.variant)?),
        }
    }

    pub fn effective_baseline<'a>(&'a self, book: &'a ProfileBook) -> Result<&'a str, ConfigError> {
        match &self.baseline_profile {
            Some(p) => Ok(p.as_str()),
            None => Ok(book.baseline_for(self.variant)?),
        }
    }

    pub fn split_spec(&self) -> Result<SplitSpec, ConfigError> {
        match self.train_end {
            None => Ok(SplitSpec::Ratio(self.train_ratio)),
            Some(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|dt| SplitSpec::TrainEnd(dt.and_utc().timestamp_millis()))
                .ok_or(ConfigError::Invalid {
                    field: "train_end",
                    reason: format!("{date} has no midnight"),
                }),
        }
    }

    pub fn train_test_config(&self) -> Result<TrainTestConfig, ConfigError> {
        Ok(TrainTestConfig {
            split: self.split_spec()?,
            min_trades: self.effective_min_trades(),
            candidate_top: self.effective_candidate_top(),
            objective: self.objective,
        })
    }

    /// Walk-forward sizes converted from days to candles of `interval`.
    pub fn walk_forward_config(&self) -> WalkForwardConfig {
        let per_day = self.interval.per_day();
        WalkForwardConfig {
            train_len: self.wf_train_days * per_day,
            test_len: self.wf_test_days * per_day,
            step: self.wf_step_days * per_day,
            min_windows: self.effective_min_windows(),
            min_trades: self.effective_min_trades(),
            candidate_top: self.effective_candidate_top(),
            objective: self.objective,
        }
    }
}
