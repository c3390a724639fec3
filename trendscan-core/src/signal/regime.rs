//! Regime + oscillator variant with independent long and short rules.
//!
//! Long entry needs every group to pass:
//! - regime:      trend EMA > long EMA and close > long EMA * floor
//! - pullback:    close <= lower band * touch buffer, or close <= fast EMA * pullback buffer
//! - rsi:         fast RSI <= fast_buy and main RSI <= main_buy
//! - volume:      volume >= volume SMA * min ratio (SMA > 0)
//! - breakdown:   close >= long EMA * (1 - max_breakdown_pct)
//! - stabilizing: close >= previous close, or fast RSI rising
//!
//! Short entry mirrors every group. When both sides pass, the side with the
//! larger threshold-exceedance score wins; a tie goes long.

use crate::domain::{CandleColumns, EntryCheck, HoldReason, Side};
use crate::indicators::{atr_wilder, bollinger_bands, ema, rsi_wilder, sma};
use crate::params::RegimeParams;

use super::Setup;

#[derive(Debug, Clone)]
pub struct RegimeIndicators {
    pub ema_fast: Vec<f64>,
    pub ema_trend: Vec<f64>,
    pub ema_long: Vec<f64>,
    pub rsi_fast: Vec<f64>,
    pub rsi_main: Vec<f64>,
    pub atr: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub volume_sma: Vec<f64>,
}

impl RegimeIndicators {
    pub fn compute(cols: &CandleColumns, p: &RegimeParams) -> Self {
        let bb = bollinger_bands(&cols.closes, p.bb_period, p.bb_stddev);
        Self {
            ema_fast: ema(&cols.closes, p.ema_fast),
            ema_trend: ema(&cols.closes, p.ema_trend),
            ema_long: ema(&cols.closes, p.ema_long),
            rsi_fast: rsi_wilder(&cols.closes, p.rsi_fast),
            rsi_main: rsi_wilder(&cols.closes, p.rsi_main),
            atr: atr_wilder(&cols.highs, &cols.lows, &cols.closes, p.atr_period),
            bb_upper: bb.upper,
            bb_lower: bb.lower,
            volume_sma: sma(&cols.volumes, p.volume_sma_period),
        }
    }
}

/// Per-group pass/fail for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideChecks {
    pub enabled: bool,
    pub regime: bool,
    pub pullback: bool,
    pub rsi: bool,
    pub volume: bool,
    pub breakout: bool,
    pub stabilizing: bool,
}

impl SideChecks {
    pub fn passed(&self) -> bool {
        self.enabled
            && self.regime
            && self.pullback
            && self.rsi
            && self.volume
            && self.breakout
            && self.stabilizing
    }

    fn failed(&self) -> Vec<EntryCheck> {
        [
            (self.regime, EntryCheck::Regime),
            (self.pullback, EntryCheck::Pullback),
            (self.rsi, EntryCheck::Rsi),
            (self.volume, EntryCheck::Volume),
            (self.breakout, EntryCheck::Breakout),
            (self.stabilizing, EntryCheck::Stabilizing),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, c)| c)
        .collect()
    }
}

struct Point {
    close: f64,
    prev_close: f64,
    volume: f64,
}

pub fn long_checks(ind: &RegimeIndicators, p: &RegimeParams, cols: &CandleColumns, i: usize) -> SideChecks {
    let pt = point(cols, i);
    let c = pt.close;
    SideChecks {
        enabled: p.trade_side.allows(Side::Long),
        regime: ind.ema_trend[i] > ind.ema_long[i] && c > ind.ema_long[i] * p.regime_price_floor,
        pullback: c <= ind.bb_lower[i] * p.bb_touch_buffer
            || c <= ind.ema_fast[i] * p.ema_pullback_buffer,
        rsi: ind.rsi_fast[i] <= p.rsi_fast_buy && ind.rsi_main[i] <= p.rsi_main_buy,
        volume: volume_ok(ind, p, pt.volume, i),
        breakout: c >= ind.ema_long[i] * (1.0 - p.max_breakdown_pct),
        stabilizing: c >= pt.prev_close || ind.rsi_fast[i] > ind.rsi_fast[i - 1],
    }
}

pub fn short_checks(ind: &RegimeIndicators, p: &RegimeParams, cols: &CandleColumns, i: usize) -> SideChecks {
    let pt = point(cols, i);
    let c = pt.close;
    SideChecks {
        enabled: p.enable_short && p.trade_side.allows(Side::Short),
        regime: ind.ema_trend[i] < ind.ema_long[i] && c < ind.ema_long[i] * p.regime_price_ceiling,
        pullback: c >= ind.bb_upper[i] * p.bb_reject_buffer
            || c >= ind.ema_fast[i] * p.ema_bounce_buffer,
        rsi: ind.rsi_fast[i] >= p.rsi_fast_sell && ind.rsi_main[i] >= p.rsi_main_sell,
        volume: volume_ok(ind, p, pt.volume, i),
        breakout: c <= ind.ema_long[i] * (1.0 + p.max_breakout_pct),
        stabilizing: c <= pt.prev_close || ind.rsi_fast[i] < ind.rsi_fast[i - 1],
    }
}

fn point(cols: &CandleColumns, i: usize) -> Point {
    Point {
        close: cols.closes[i],
        prev_close: cols.closes[i - 1],
        volume: cols.volumes[i],
    }
}

fn volume_ok(ind: &RegimeIndicators, p: &RegimeParams, volume: f64, i: usize) -> bool {
    ind.volume_sma[i] > 0.0 && volume >= ind.volume_sma[i] * p.min_volume_ratio
}

/// Threshold-exceedance score used only when both sides pass.
fn score(ind: &RegimeIndicators, p: &RegimeParams, close: f64, i: usize, side: Side) -> f64 {
    match side {
        Side::Long => {
            (p.rsi_fast_buy - ind.rsi_fast[i]).max(0.0)
                + (p.rsi_main_buy - ind.rsi_main[i]).max(0.0)
                + ((ind.bb_lower[i] - close) / close * 100.0).max(0.0)
        }
        Side::Short => {
            (ind.rsi_fast[i] - p.rsi_fast_sell).max(0.0)
                + (ind.rsi_main[i] - p.rsi_main_sell).max(0.0)
                + ((close - ind.bb_upper[i]) / close * 100.0).max(0.0)
        }
    }
}

/// Short only when strictly stronger.
fn pick_side(long_score: f64, short_score: f64) -> Side {
    if short_score > long_score {
        Side::Short
    } else {
        Side::Long
    }
}

pub fn confidence(ind: &RegimeIndicators, cols: &CandleColumns, i: usize, side: Side) -> f64 {
    let close = cols.closes[i];
    let volume_confirmed = ind.volume_sma[i] > 0.0 && cols.volumes[i] >= ind.volume_sma[i];
    let (band, regime, rsi_main, rsi_fast) = match side {
        Side::Long => (
            close <= ind.bb_lower[i],
            ind.ema_trend[i] > ind.ema_long[i],
            ind.rsi_main[i] <= 33.0,
            ind.rsi_fast[i] <= 18.0,
        ),
        Side::Short => (
            close >= ind.bb_upper[i],
            ind.ema_trend[i] < ind.ema_long[i],
            ind.rsi_main[i] >= 67.0,
            ind.rsi_fast[i] >= 82.0,
        ),
    };

    let mut c: f64 = 0.45;
    if band {
        c += 0.15;
    }
    for hit in [regime, rsi_main, rsi_fast, volume_confirmed] {
        if hit {
            c += 0.10;
        }
    }
    c.min(1.0)
}

pub(crate) fn setup(
    ind: &RegimeIndicators,
    p: &RegimeParams,
    cols: &CandleColumns,
    i: usize,
) -> Result<Setup, HoldReason> {
    let long = long_checks(ind, p, cols, i);
    let short = short_checks(ind, p, cols, i);
    let close = cols.closes[i];

    let side = match (long.passed(), short.passed()) {
        (true, true) => pick_side(
            score(ind, p, close, i, Side::Long),
            score(ind, p, close, i, Side::Short),
        ),
        (true, false) => Side::Long,
        (false, true) => Side::Short,
        (false, false) => {
            let short_failed = short.failed();
            let failed = long
                .failed()
                .into_iter()
                .filter(|c| short_failed.contains(c))
                .collect();
            return Err(HoldReason::NoEntry { failed });
        }
    };

    let reason = match side {
        Side::Long => format!(
            "regime long: RSI{} {:.1} RSI{} {:.1}",
            p.rsi_fast, ind.rsi_fast[i], p.rsi_main, ind.rsi_main[i]
        ),
        Side::Short => format!(
            "regime short: RSI{} {:.1} RSI{} {:.1}",
            p.rsi_fast, ind.rsi_fast[i], p.rsi_main, ind.rsi_main[i]
        ),
    };
    Ok(Setup {
        side,
        confidence: confidence(ind, cols, i, side),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use crate::params::TradeSide;

    /// Two-point indicator snapshot; index 1 is evaluated.
    fn snapshot() -> (RegimeIndicators, CandleColumns) {
        let ind = RegimeIndicators {
            ema_fast: vec![100.0, 100.0],
            ema_trend: vec![100.0, 100.0],
            ema_long: vec![100.0, 100.0],
            rsi_fast: vec![50.0, 50.0],
            rsi_main: vec![50.0, 50.0],
            atr: vec![1.0, 1.0],
            bb_upper: vec![105.0, 105.0],
            bb_lower: vec![95.0, 95.0],
            volume_sma: vec![1000.0, 1000.0],
        };
        let cols = CandleColumns {
            closes: vec![100.0, 100.0],
            highs: vec![101.0, 101.0],
            lows: vec![99.0, 99.0],
            volumes: vec![1000.0, 1000.0],
        };
        (ind, cols)
    }

    fn long_setup() -> (RegimeIndicators, CandleColumns) {
        let (mut ind, mut cols) = snapshot();
        ind.ema_trend[1] = 104.0;
        ind.ema_long[1] = 100.0;
        ind.ema_fast[1] = 104.0;
        ind.rsi_fast[1] = 15.0;
        ind.rsi_main[1] = 30.0;
        cols.closes = vec![101.0, 102.0];
        (ind, cols)
    }

    #[test]
    fn long_fires_when_every_group_passes() {
        let (ind, cols) = long_setup();
        let s = setup(&ind, &RegimeParams::default(), &cols, 1).unwrap();
        assert_eq!(s.side, Side::Long);
        // 0.45 + regime 0.1 + rsi main 0.1 + rsi fast 0.1 + volume 0.1
        assert_approx(s.confidence, 0.85, DEFAULT_EPSILON);
    }

    #[test]
    fn low_volume_blocks_entry() {
        let (ind, mut cols) = long_setup();
        cols.volumes[1] = 100.0;
        let err = setup(&ind, &RegimeParams::default(), &cols, 1).unwrap_err();
        match err {
            HoldReason::NoEntry { failed } => assert!(failed.contains(&EntryCheck::Volume)),
            other => panic!("unexpected hold: {other:?}"),
        }
    }

    #[test]
    fn failed_groups_are_shared_by_both_sides() {
        let (ind, cols) = snapshot();
        let err = setup(&ind, &RegimeParams::default(), &cols, 1).unwrap_err();
        // flat snapshot: regime and rsi fail both ways, volume passes
        match err {
            HoldReason::NoEntry { failed } => {
                assert!(failed.contains(&EntryCheck::Regime));
                assert!(failed.contains(&EntryCheck::Rsi));
                assert!(!failed.contains(&EntryCheck::Volume));
            }
            other => panic!("unexpected hold: {other:?}"),
        }
    }

    #[test]
    fn short_mirror_fires() {
        let (mut ind, mut cols) = snapshot();
        ind.ema_trend[1] = 96.0;
        ind.ema_long[1] = 100.0;
        ind.ema_fast[1] = 96.0;
        ind.rsi_fast[1] = 85.0;
        ind.rsi_main[1] = 70.0;
        cols.closes = vec![99.0, 98.0];
        let s = setup(&ind, &RegimeParams::default(), &cols, 1).unwrap();
        assert_eq!(s.side, Side::Short);
        assert_approx(s.confidence, 0.85, DEFAULT_EPSILON);
    }

    #[test]
    fn short_disabled_by_flag_or_trade_side() {
        let (mut ind, mut cols) = snapshot();
        ind.ema_trend[1] = 96.0;
        ind.ema_fast[1] = 96.0;
        ind.rsi_fast[1] = 85.0;
        ind.rsi_main[1] = 70.0;
        cols.closes = vec![99.0, 98.0];

        let no_short = RegimeParams {
            enable_short: false,
            ..RegimeParams::default()
        };
        assert!(setup(&ind, &no_short, &cols, 1).is_err());

        let long_only = RegimeParams {
            trade_side: TradeSide::LongOnly,
            ..RegimeParams::default()
        };
        assert!(setup(&ind, &long_only, &cols, 1).is_err());
    }

    #[test]
    fn tie_break_scores() {
        let (ind, _) = snapshot();
        let p = RegimeParams {
            rsi_fast_buy: 60.0,
            rsi_main_buy: 60.0,
            rsi_fast_sell: 40.0,
            rsi_main_sell: 40.0,
            ..RegimeParams::default()
        };
        // long: 10 + 10 + 0 (close above lower band)
        assert_eq!(score(&ind, &p, 100.0, 1, Side::Long), 20.0);
        // short: 10 + 10 + 0 (close below upper band)
        assert_eq!(score(&ind, &p, 100.0, 1, Side::Short), 20.0);
        assert_eq!(pick_side(20.0, 20.0), Side::Long);
        assert_eq!(pick_side(20.0, 20.5), Side::Short);
        // band penetration adds percent distance
        assert_approx(score(&ind, &p, 94.0, 1, Side::Long), 20.0 + 100.0 / 94.0, DEFAULT_EPSILON);
    }

    #[test]
    fn confidence_accrues_and_caps_at_one() {
        let (mut ind, mut cols) = long_setup();
        assert_approx(confidence(&ind, &cols, 1, Side::Short), 0.55, DEFAULT_EPSILON);
        // every increment fires: 0.45 + 0.15 + 4 * 0.10
        cols.closes[1] = 94.0;
        ind.rsi_fast[1] = 10.0;
        cols.volumes[1] = 5000.0;
        assert_approx(confidence(&ind, &cols, 1, Side::Long), 1.0, DEFAULT_EPSILON);
        assert!(confidence(&ind, &cols, 1, Side::Long) <= 1.0);
    }

    #[test]
    fn stabilizing_accepts_rising_fast_rsi() {
        let (mut ind, mut cols) = long_setup();
        cols.closes = vec![103.0, 102.0];
        ind.rsi_fast = vec![10.0, 15.0];
        let checks = long_checks(&ind, &RegimeParams::default(), &cols, 1);
        assert!(checks.stabilizing);
        ind.rsi_fast = vec![20.0, 15.0];
        let checks = long_checks(&ind, &RegimeParams::default(), &cols, 1);
        assert!(!checks.stabilizing);
    }
}
