//! CSV candle files with header `timestamp,open,high,low,close,volume`.
//!
//! Reading validates every row (no NaN, high >= low, positive prices) and
//! normalises the result.

use std::io::{Read, Write};
use std::path::Path;

use super::normalize::normalize_candles;
use super::DataError;
use crate::domain::Candle;

pub fn read_candles(path: &Path) -> Result<Vec<Candle>, DataError> {
    let file = std::fs::File::open(path)?;
    read_candles_from(file)
}

pub fn read_candles_from<R: Read>(reader: R) -> Result<Vec<Candle>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    for (row, record) in rdr.deserialize::<Candle>().enumerate() {
        let candle = record?;
        if !candle.is_sane() {
            return Err(DataError::InvalidCandle {
                row: row + 1,
                reason: format!(
                    "o={} h={} l={} c={} v={}",
                    candle.open, candle.high, candle.low, candle.close, candle.volume
                ),
            });
        }
        candles.push(candle);
    }
    Ok(normalize_candles(candles))
}

pub fn write_candles(path: &Path, candles: &[Candle]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_candles_to(file, candles)
}

pub fn write_candles_to<W: Write>(writer: W, candles: &[Candle]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for c in candles {
        wtr.serialize(c)?;
    }
    wtr.flush()?;
    Ok(())
}
