//! Parameter grids for the two strategy variants.
//!
//! A grid is a set of axes; `generate` expands the cartesian product over a
//! base parameter set, so every field not on an axis keeps its base value.

use serde::{Deserialize, Serialize};

use trendscan_core::params::{
    RegimeParams, StrategyParams, StrategyVariant, TradeSide, TrendCrossParams,
};

use crate::search::SearchError;

/// Axes of the trend-cross grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendGrid {
    pub stop_loss_atr_mult: Vec<f64>,
    pub take_profit_atr_mult: Vec<f64>,
    pub cooldown_candles: Vec<usize>,
    pub use_price_filter: Vec<bool>,
    pub min_ema_spread_pct: Vec<f64>,
    pub trade_side: Vec<TradeSide>,
}

impl Default for TrendGrid {
    fn default() -> Self {
        Self {
            stop_loss_atr_mult: vec![2.0, 2.5, 3.0, 3.5, 4.0],
            take_profit_atr_mult: vec![2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0],
            cooldown_candles: vec![1, 2, 3, 4, 6, 8, 12],
            use_price_filter: vec![false],
            min_ema_spread_pct: vec![0.0],
            trade_side: vec![TradeSide::Both],
        }
    }
}

impl TrendGrid {
    pub fn size(&self) -> usize {
        self.stop_loss_atr_mult.len()
            * self.take_profit_atr_mult.len()
            * self.cooldown_candles.len()
            * self.use_price_filter.len()
            * self.min_ema_spread_pct.len()
            * self.trade_side.len()
    }

    fn generate(&self, base: &TrendCrossParams) -> Vec<StrategyParams> {
        let mut out = Vec::with_capacity(self.size());
        for &sl in &self.stop_loss_atr_mult {
            for &tp in &self.take_profit_atr_mult {
                for &cd in &self.cooldown_candles {
                    for &filter in &self.use_price_filter {
                        for &spread in &self.min_ema_spread_pct {
                            for &side in &self.trade_side {
                                out.push(StrategyParams::TrendCross(TrendCrossParams {
                                    stop_loss_atr_mult: sl,
                                    take_profit_atr_mult: tp,
                                    cooldown_candles: cd,
                                    use_price_filter: filter,
                                    min_ema_spread_pct: spread,
                                    trade_side: side,
                                    ..base.clone()
                                }));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// Axes of the regime-oscillator grid.
///
/// Combinations whose fast-RSI sell threshold is not above the main-RSI sell
/// threshold are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeGrid {
    pub stop_loss_atr_mult: Vec<f64>,
    pub take_profit_atr_mult: Vec<f64>,
    pub rsi_fast_sell: Vec<f64>,
    pub rsi_main_sell: Vec<f64>,
    pub cooldown_candles: Vec<usize>,
    pub max_hold_candles: Vec<usize>,
}

impl Default for RegimeGrid {
    fn default() -> Self {
        Self {
            stop_loss_atr_mult: vec![2.4, 2.8, 3.2, 3.6],
            take_profit_atr_mult: vec![2.8, 3.2, 3.6, 4.0, 4.4],
            rsi_fast_sell: vec![75.0, 79.0, 83.0],
            rsi_main_sell: vec![62.0, 66.0, 70.0],
            cooldown_candles: vec![4, 6, 8],
            max_hold_candles: vec![72, 96],
        }
    }
}

impl RegimeGrid {
    fn sell_pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rsi_fast_sell.iter().flat_map(move |&fs| {
            self.rsi_main_sell
                .iter()
                .filter(move |&&ms| fs > ms)
                .map(move |&ms| (fs, ms))
        })
    }

    pub fn size(&self) -> usize {
        self.stop_loss_atr_mult.len()
            * self.take_profit_atr_mult.len()
            * self.sell_pairs().count()
            * self.cooldown_candles.len()
            * self.max_hold_candles.len()
    }

    fn generate(&self, base: &RegimeParams) -> Vec<StrategyParams> {
        let mut out = Vec::with_capacity(self.size());
        for &sl in &self.stop_loss_atr_mult {
            for &tp in &self.take_profit_atr_mult {
                for (fs, ms) in self.sell_pairs() {
                    for &cd in &self.cooldown_candles {
                        for &hold in &self.max_hold_candles {
                            out.push(StrategyParams::RegimeOscillator(RegimeParams {
                                stop_loss_atr_mult: sl,
                                take_profit_atr_mult: tp,
                                rsi_fast_sell: fs,
                                rsi_main_sell: ms,
                                cooldown_candles: cd,
                                max_hold_candles: Some(hold),
                                ..base.clone()
                            }));
                        }
                    }
                }
            }
        }
        out
    }
}

/// A grid for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ParamGrid {
    TrendCross(TrendGrid),
    RegimeOscillator(RegimeGrid),
}

impl ParamGrid {
    /// The built-in search grid for a variant.
    pub fn default_for(variant: StrategyVariant) -> Self {
        match variant {
            StrategyVariant::TrendCross => ParamGrid::TrendCross(TrendGrid::default()),
            StrategyVariant::RegimeOscillator => ParamGrid::RegimeOscillator(RegimeGrid::default()),
        }
    }

    pub fn variant(&self) -> StrategyVariant {
        match self {
            ParamGrid::TrendCross(_) => StrategyVariant::TrendCross,
            ParamGrid::RegimeOscillator(_) => StrategyVariant::RegimeOscillator,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            ParamGrid::TrendCross(g) => g.size(),
            ParamGrid::RegimeOscillator(g) => g.size(),
        }
    }

    /// Expand the grid over `base`. Order is deterministic: axes nest in
    /// declaration order, the last axis varying fastest.
    pub fn generate(&self, base: &StrategyParams) -> Result<Vec<StrategyParams>, SearchError> {
        let combos = match (self, base) {
            (ParamGrid::TrendCross(g), StrategyParams::TrendCross(p)) => g.generate(p),
            (ParamGrid::RegimeOscillator(g), StrategyParams::RegimeOscillator(p)) => g.generate(p),
            _ => {
                return Err(SearchError::VariantMismatch {
                    grid: self.variant(),
                    base: base.variant(),
                })
            }
        };
        if combos.is_empty() {
            return Err(SearchError::EmptyGrid);
        }
        Ok(combos)
    }
}
