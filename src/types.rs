//! Core data types used across the trading system

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Current quotes: `buy` is the ask we pay, `sell` is the bid we receive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub buy: f64,
    pub sell: f64,
}

/// Account balances and the proportional fee (percent) charged per trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub usd: f64,
    pub btc: f64,
    pub fee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: u64,
}

/// Exchange acknowledgement of a newly placed limit order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: u64,
    pub side: Side,
    pub amount: f64,
    pub price: f64,
}

/// A completed trade as reported by the exchange.
///
/// `usd` is positive for a sale (cash received) and negative for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserTransaction {
    pub time: i64,
    pub usd: f64,
    pub btc: f64,
    pub rate: f64,
}

impl UserTransaction {
    pub fn side(&self) -> Option<Side> {
        if self.usd < 0.0 {
            Some(Side::Buy)
        } else if self.usd > 0.0 {
            Some(Side::Sell)
        } else {
            None
        }
    }
}

/// One recorded price observation together with its smoothed values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub time: i64,
    pub buy: f64,
    pub sell: f64,
    pub wa_buy: f64,
    pub wa_sell: f64,
}

/// Persisted price band of a banded rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub fn new(lower: f64, upper: f64) -> Self {
        Band { lower, upper }
    }

    /// Move both edges by the same amount
    pub fn shifted(&self, delta: f64) -> Self {
        Band {
            lower: self.lower + delta,
            upper: self.upper + delta,
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2} - ${:.2}", self.lower, self.upper)
    }
}

/// Human readable `MM-DD HH:MM` rendering of a unix timestamp
pub fn format_time(t: i64) -> String {
    DateTime::from_timestamp(t, 0)
        .map(|dt| dt.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| t.to_string())
}
