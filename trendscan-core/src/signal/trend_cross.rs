//! EMA-cross trend variant.
//!
//! trend_up   = fast > mid > slow          (down: fast < mid < slow)
//! golden     = fast[i-1] <= mid[i-1] && fast[i] > mid[i]
//! death      = fast[i-1] >= mid[i-1] && fast[i] < mid[i]
//!
//! An entry needs alignment AND a cross on the evaluated step; an
//! established trend never re-fires.
//!
//! confidence = 0.5 + min(|fast - slow| / slow * 10, 0.2)
//!                  + min(|close - mid| / mid * 5, 0.1)
//!                  + 0.1 when fully aligned, capped at 1.0

use crate::domain::{CandleColumns, HoldReason, Side};
use crate::indicators::{atr_wilder, ema};
use crate::params::TrendCrossParams;

use super::Setup;

/// Precomputed series for one candle window.
#[derive(Debug, Clone)]
pub struct TrendIndicators {
    pub fast: Vec<f64>,
    pub mid: Vec<f64>,
    pub slow: Vec<f64>,
    pub atr: Vec<f64>,
}

impl TrendIndicators {
    pub fn compute(cols: &CandleColumns, p: &TrendCrossParams) -> Self {
        Self {
            fast: ema(&cols.closes, p.fast_period),
            mid: ema(&cols.closes, p.mid_period),
            slow: ema(&cols.closes, p.slow_period),
            atr: atr_wilder(&cols.highs, &cols.lows, &cols.closes, p.atr_period),
        }
    }
}

/// Confidence of an aligned setup at index `i`.
pub fn confidence(ind: &TrendIndicators, close: f64, i: usize) -> f64 {
    let (fast, mid, slow) = (ind.fast[i], ind.mid[i], ind.slow[i]);
    let mut c = 0.5;
    if slow != 0.0 {
        c += ((fast - slow).abs() / slow * 10.0).min(0.2);
    }
    if mid != 0.0 {
        c += ((close - mid).abs() / mid * 5.0).min(0.1);
    }
    if (fast > mid && mid > slow) || (fast < mid && mid < slow) {
        c += 0.1;
    }
    c.min(1.0)
}

pub(crate) fn setup(
    ind: &TrendIndicators,
    p: &TrendCrossParams,
    closes: &[f64],
    i: usize,
) -> Result<Setup, HoldReason> {
    let (f0, m0) = (ind.fast[i - 1], ind.mid[i - 1]);
    let (f1, m1, s1) = (ind.fast[i], ind.mid[i], ind.slow[i]);
    let close = closes[i];

    let trend_up = f1 > m1 && m1 > s1;
    let trend_down = f1 < m1 && m1 < s1;
    let golden = f0 <= m0 && f1 > m1;
    let death = f0 >= m0 && f1 < m1;

    let side = if trend_up && golden {
        Side::Long
    } else if trend_down && death {
        Side::Short
    } else {
        return Err(HoldReason::NoSetup);
    };

    if p.min_ema_spread_pct > 0.0 {
        let spread_pct = if m1 != 0.0 { (f1 - m1).abs() / m1 * 100.0 } else { 0.0 };
        if spread_pct < p.min_ema_spread_pct {
            return Err(HoldReason::NoSetup);
        }
    }
    if p.use_price_filter {
        let ok = match side {
            Side::Long => close > m1,
            Side::Short => close < m1,
        };
        if !ok {
            return Err(HoldReason::NoSetup);
        }
    }
    if !p.trade_side.allows(side) {
        return Err(HoldReason::SideDisabled { side });
    }

    let reason = match side {
        Side::Long => "EMA9>EMA21>EMA55 golden cross",
        Side::Short => "EMA9<EMA21<EMA55 death cross",
    };
    Ok(Setup {
        side,
        confidence: confidence(ind, close, i),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use crate::params::TradeSide;

    fn ind(fast: [f64; 2], mid: [f64; 2], slow: [f64; 2]) -> TrendIndicators {
        TrendIndicators {
            fast: fast.to_vec(),
            mid: mid.to_vec(),
            slow: slow.to_vec(),
            atr: vec![1.0, 1.0],
        }
    }

    #[test]
    fn golden_cross_in_uptrend_is_long() {
        let i = ind([99.0, 102.0], [100.0, 101.0], [98.0, 99.0]);
        let s = setup(&i, &TrendCrossParams::default(), &[100.0, 101.0], 1).unwrap();
        assert_eq!(s.side, Side::Long);
    }

    #[test]
    fn death_cross_in_downtrend_is_short() {
        let i = ind([101.0, 98.0], [100.0, 99.0], [102.0, 101.0]);
        let s = setup(&i, &TrendCrossParams::default(), &[100.0, 99.0], 1).unwrap();
        assert_eq!(s.side, Side::Short);
    }

    #[test]
    fn sustained_alignment_does_not_refire() {
        // already above on the previous step: no fresh cross
        let i = ind([101.5, 102.0], [100.0, 101.0], [98.0, 99.0]);
        let err = setup(&i, &TrendCrossParams::default(), &[100.0, 101.0], 1).unwrap_err();
        assert_eq!(err, HoldReason::NoSetup);
    }

    #[test]
    fn cross_without_alignment_holds() {
        // golden cross but slow above mid
        let i = ind([99.0, 102.0], [100.0, 101.0], [105.0, 104.0]);
        assert!(setup(&i, &TrendCrossParams::default(), &[100.0, 101.0], 1).is_err());
    }

    #[test]
    fn price_filter_blocks_long_below_mid() {
        let i = ind([99.0, 102.0], [100.0, 101.0], [98.0, 99.0]);
        let p = TrendCrossParams {
            use_price_filter: true,
            ..TrendCrossParams::default()
        };
        assert!(setup(&i, &p, &[100.0, 100.5], 1).is_err());
        assert!(setup(&i, &p, &[100.0, 101.5], 1).is_ok());
    }

    #[test]
    fn spread_filter_requires_separation() {
        let i = ind([99.0, 101.05], [100.0, 101.0], [98.0, 99.0]);
        let p = TrendCrossParams {
            min_ema_spread_pct: 0.1,
            ..TrendCrossParams::default()
        };
        // spread = 0.05 / 101 * 100 ~ 0.0495%
        assert!(setup(&i, &p, &[100.0, 101.0], 1).is_err());
    }

    #[test]
    fn long_only_disables_short() {
        let i = ind([101.0, 98.0], [100.0, 99.0], [102.0, 101.0]);
        let p = TrendCrossParams {
            trade_side: TradeSide::LongOnly,
            ..TrendCrossParams::default()
        };
        let err = setup(&i, &p, &[100.0, 99.0], 1).unwrap_err();
        assert_eq!(err, HoldReason::SideDisabled { side: Side::Short });
    }

    #[test]
    fn confidence_terms_and_cap() {
        // spread term: |110-100|/100*10 = 1.0 -> capped 0.2
        // distance term: |105-105|/105*5 = 0
        let i = ind([0.0, 110.0], [0.0, 105.0], [0.0, 100.0]);
        assert_approx(confidence(&i, 105.0, 1), 0.8, DEFAULT_EPSILON);
        // distance term capped at 0.1
        assert_approx(confidence(&i, 120.0, 1), 0.9, DEFAULT_EPSILON);
        // small spread: |100.5-100|/100*10 = 0.05, not aligned
        let j = ind([0.0, 100.5], [0.0, 101.0], [0.0, 100.0]);
        assert_approx(confidence(&j, 101.0, 1), 0.55, DEFAULT_EPSILON);
    }
}
