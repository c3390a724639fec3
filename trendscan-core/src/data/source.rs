//! Candle source trait and the chunked retrieval adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::normalize::normalize_candles;
use super::DataError;
use crate::domain::Candle;

/// Candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "15m")]
    M15,
    #[default]
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    pub fn millis(self) -> i64 {
        match self {
            Interval::M15 => 15 * 60_000,
            Interval::H1 => 3_600_000,
            Interval::H4 => 4 * 3_600_000,
            Interval::D1 => 24 * 3_600_000,
        }
    }

    pub fn per_day(self) -> usize {
        (Interval::D1.millis() / self.millis()) as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "15m" => Ok(Interval::M15),
            "1h" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            other => Err(DataError::UnknownInterval(other.to_string())),
        }
    }
}

/// Anything that can return candles for a symbol and time range.
///
/// Returned candles should fall in `[start_ms, end_ms]`; ordering and
/// de-duplication are not required of implementors.
pub trait CandleSource {
    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, DataError>;
}

impl<T: CandleSource + ?Sized> CandleSource for &T {
    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, DataError> {
        (**self).fetch(symbol, interval, start_ms, end_ms)
    }
}

/// Splits a long range into requests of at most `chunk_len` candles.
///
/// Stops when a chunk comes back empty or short, advances past the last
/// returned timestamp, and normalises the merged result.
pub struct ChunkedSource<S> {
    inner: S,
    chunk_len: usize,
}

impl<S: CandleSource> ChunkedSource<S> {
    pub const DEFAULT_CHUNK: usize = 4000;

    pub fn new(inner: S) -> Self {
        Self::with_chunk_len(inner, Self::DEFAULT_CHUNK)
    }

    pub fn with_chunk_len(inner: S, chunk_len: usize) -> Self {
        Self {
            inner,
            chunk_len: chunk_len.max(1),
        }
    }
}

impl<S: CandleSource> CandleSource for ChunkedSource<S> {
    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, DataError> {
        let span = interval.millis() * self.chunk_len as i64;
        let mut all = Vec::new();
        let mut cursor = start_ms;

        while cursor < end_ms {
            let chunk_end = (cursor + span).min(end_ms);
            let chunk = self.inner.fetch(symbol, interval, cursor, chunk_end)?;
            debug!(symbol, cursor, returned = chunk.len(), "fetched candle chunk");

            let Some(last_ts) = chunk.iter().map(|c| c.timestamp).max() else {
                break;
            };
            let short = chunk.len() < self.chunk_len;
            all.extend(chunk);
            if short {
                break;
            }
            cursor = last_ts + 1;
        }

        Ok(normalize_candles(all))
    }
}
