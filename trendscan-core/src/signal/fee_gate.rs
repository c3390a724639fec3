//! Fee-adjusted profitability gate.
//!
//! Models taker fees on both legs: the open leg on the notional and the close
//! leg on the notional grown by the take-profit move.
//!
//!   pc          = |take_profit - entry| / entry
//!   gross       = size * pc
//!   fees        = size * fee + size * (1 + pc) * fee
//!   net_pct     = (gross - fees) / size        (0 when size <= 0)

/// Outcome of one fee check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeCheck {
    pub valid: bool,
    pub gross_profit: f64,
    pub total_fees: f64,
    pub net_profit: f64,
    pub net_profit_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeGate {
    pub taker_fee: f64,
    pub min_profit_after_fee: f64,
}

impl FeeGate {
    pub fn new(taker_fee: f64, min_profit_after_fee: f64) -> Self {
        Self {
            taker_fee,
            min_profit_after_fee,
        }
    }

    pub fn check(&self, size_usd: f64, entry_price: f64, take_profit: f64) -> FeeCheck {
        let price_change = if entry_price > 0.0 {
            (take_profit - entry_price).abs() / entry_price
        } else {
            0.0
        };
        let gross_profit = size_usd * price_change;
        let total_fees =
            size_usd * self.taker_fee + size_usd * (1.0 + price_change) * self.taker_fee;
        let net_profit = gross_profit - total_fees;
        let net_profit_pct = if size_usd > 0.0 {
            net_profit / size_usd
        } else {
            0.0
        };
        FeeCheck {
            valid: net_profit_pct >= self.min_profit_after_fee,
            gross_profit,
            total_fees,
            net_profit,
            net_profit_pct,
        }
    }
}
