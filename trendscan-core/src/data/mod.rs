//! Candle collaborators: sources, normalisation, CSV files, synthetic data
//! and the order-execution seam.
//!
//! The simulator only ever sees a sorted, de-duplicated `&[Candle]`. Getting
//! there (chunked retrieval, merging, file I/O) happens here.

pub mod csv_file;
pub mod executor;
pub mod normalize;
pub mod source;
pub mod synthetic;

pub use csv_file::{read_candles, read_candles_from, write_candles, write_candles_to};
pub use executor::{OrderExecutor, OrderRequest, OrderStatus, TimeInForce};
pub use normalize::normalize_candles;
pub use source::{CandleSource, ChunkedSource, Interval};
pub use synthetic::synthetic_candles;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("candle source failed for {symbol}: {reason}")]
    Source { symbol: String, reason: String },

    #[error("unknown interval '{0}' (expected 15m, 1h, 4h or 1d)")]
    UnknownInterval(String),

    #[error("invalid candle at row {row}: {reason}")]
    InvalidCandle { row: usize, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
