//! Order-execution seam.
//!
//! The core never places orders. A surrounding application turns an
//! `EntrySignal` into an `OrderRequest` and hands it to whatever implements
//! `OrderExecutor` (an exchange client, a paper book, a test double).

use serde::{Deserialize, Serialize};

use super::DataError;
use crate::domain::{EntrySignal, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Immediate-or-cancel: the taker model every fee calculation assumes.
    #[default]
    Ioc,
    Gtc,
    /// Add-liquidity-only (post-only).
    Alo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub size_usd: f64,
    pub price: f64,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
}

impl OrderRequest {
    /// Opening order for an entry signal.
    pub fn from_entry(symbol: &str, entry: &EntrySignal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: entry.side,
            size_usd: entry.size_usd,
            price: entry.entry_price,
            time_in_force: TimeInForce::Ioc,
            reduce_only: false,
        }
    }

    /// Reduce-only order that closes a position opened by `entry` at `price`.
    pub fn close_for(symbol: &str, entry: &EntrySignal, price: f64) -> Self {
        let side = match entry.side {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        };
        Self {
            symbol: symbol.to_string(),
            side,
            size_usd: entry.size_usd,
            price,
            time_in_force: TimeInForce::Ioc,
            reduce_only: true,
        }
    }

    /// Base-asset quantity at the order price.
    pub fn quantity(&self) -> f64 {
        if self.price > 0.0 {
            self.size_usd / self.price
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderStatus {
    Filled { avg_price: f64, quantity: f64 },
    Resting { order_id: String },
    Rejected { reason: String },
}

pub trait OrderExecutor {
    fn submit(&mut self, order: &OrderRequest) -> Result<OrderStatus, DataError>;
}
