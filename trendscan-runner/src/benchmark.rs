//! Full-sample benchmark of the built-in profiles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use trendscan_core::params::{AccountConfig, StrategyParams, StrategyVariant};
use trendscan_core::{Candle, ProfileBook};

use crate::metrics::RunStats;
use crate::search::ParameterSearch;

/// One profile's full-sample result. A profile that cannot run keeps its error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub profile: String,
    pub label: String,
    pub params: Option<StrategyParams>,
    pub stats: Option<RunStats>,
    pub error: Option<String>,
}

/// Run every profile of `variant`, resolved for `symbol`, on `candles`.
pub fn benchmark_profiles(
    candles: &[Candle],
    book: &ProfileBook,
    variant: StrategyVariant,
    symbol: &str,
    account: &AccountConfig,
) -> Vec<BenchmarkRow> {
    let search = ParameterSearch::new(*account).with_parallelism(false);
    book.names_for(variant)
        .into_iter()
        .map(|name| {
            let outcome = book
                .resolve(&name, symbol)
                .map_err(|e| e.to_string())
                .and_then(|p| {
                    search
                        .evaluate(candles, &p)
                        .map(|r| (p, r.stats))
                        .map_err(|e| e.to_string())
                });
            debug!(profile = %name, ok = outcome.is_ok(), "benchmark");
            match outcome {
                Ok((params, stats)) => BenchmarkRow {
                    profile: name,
                    label: params.label(),
                    params: Some(params),
                    stats: Some(stats),
                    error: None,
                },
                Err(e) => BenchmarkRow {
                    profile: name,
                    label: String::new(),
                    params: None,
                    stats: None,
                    error: Some(e),
                },
            }
        })
        .collect()
}
