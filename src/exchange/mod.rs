//! Exchange access
//!
//! The [`Exchange`] trait is the only way the decision engine and the order
//! executor talk to the market. [`bitstamp::BitstampClient`] implements it over
//! the Bitstamp REST API; [`paper::PaperExchange`] is an in-memory simulation
//! used for dry runs.

pub mod auth;
pub mod bitstamp;
pub mod paper;

pub use bitstamp::BitstampClient;
pub use paper::PaperExchange;

use tracing::debug;

use crate::error::Result;
use crate::types::{Balance, OpenOrder, OrderAck, Ticker, UserTransaction};

/// Operations the trading core needs from an exchange.
///
/// Every call may fail with [`crate::TradeError::Api`] carrying the exchange's
/// error payload.
pub trait Exchange {
    /// Current ask (`buy`) and bid (`sell`)
    fn current_price(&self) -> Result<Ticker>;

    fn balance(&self) -> Result<Balance>;

    fn open_orders(&self) -> Result<Vec<OpenOrder>>;

    fn cancel_order(&self, id: u64) -> Result<()>;

    /// Place a buy limit order for `amount` BTC at `price`
    fn buy_order(&self, amount: f64, price: f64) -> Result<OrderAck>;

    /// Place a sell limit order for `amount` BTC at `price`
    fn sell_order(&self, amount: f64, price: f64) -> Result<OrderAck>;

    /// Completed trades, most recent first
    fn transactions(&self) -> Result<Vec<UserTransaction>>;

    /// Cancel every open order, returning how many were cancelled
    fn cancel_all_orders(&self) -> Result<usize> {
        let orders = self.open_orders()?;
        for order in &orders {
            self.cancel_order(order.id)?;
        }
        debug!("Cancelled {} open orders", orders.len());
        Ok(orders.len())
    }
}
