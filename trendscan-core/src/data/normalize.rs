use crate::domain::Candle;

/// Sort ascending by timestamp and drop repeated timestamps; the first
/// occurrence in the input wins.
pub fn normalize_candles(mut candles: Vec<Candle>) -> Vec<Candle> {
    // stable sort keeps input order among equal timestamps
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(ts: i64, close: f64) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn sorts_and_dedups_first_wins() {
        let out = normalize_candles(vec![c(3, 3.0), c(1, 1.0), c(3, 30.0), c(2, 2.0), c(1, 10.0)]);
        let ts: Vec<i64> = out.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![1, 2, 3]);
        assert_eq!(out[0].close, 1.0);
        assert_eq!(out[2].close, 3.0);
    }

    #[test]
    fn empty_input() {
        assert!(normalize_candles(vec![]).is_empty());
    }
}
