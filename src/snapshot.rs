//! Point-in-time market and account snapshot
//!
//! A [`Data`] is built once at the start of a cycle and handed to every
//! decision by shared reference, so all rules see the same view.

use tracing::debug;

use crate::error::{Result, TradeError};
use crate::exchange::Exchange;
use crate::history::HistoryStore;
use crate::types::{format_time, Side};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    /// Time of the most recent recorded price tick
    pub time: i64,
    pub buy: f64,
    pub sell: f64,
    /// Smoothed buy quote of the most recent tick
    pub avg_buy: f64,
    /// Smoothed sell quote of the most recent tick
    pub avg_sell: f64,

    pub usd_balance: f64,
    pub btc_balance: f64,

    pub last_buy_price: f64,
    pub last_buy_time: i64,
    pub last_sell_price: f64,
    pub last_sell_time: i64,

    /// Buy quotes since BTC was last sold
    pub buy_prices: Vec<f64>,
    /// Sell quotes since BTC was last bought
    pub sell_prices: Vec<f64>,
    /// Smoothed sell quotes since BTC was last bought
    pub weighted_sell_prices: Vec<f64>,
}

impl Data {
    /// Collect the snapshot from the history store and the exchange.
    ///
    /// Fails with [`TradeError::DataUnavailable`] when there is no recorded
    /// tick or no prior buy/sell transaction.
    pub fn observe(history: &HistoryStore, exchange: &dyn Exchange) -> Result<Data> {
        let tick = history
            .latest_tick()?
            .ok_or_else(|| TradeError::DataUnavailable("no price ticks recorded".to_string()))?;

        let balance = exchange.balance()?;

        let last_sell = history.last_trade(Side::Sell)?.ok_or_else(|| {
            TradeError::DataUnavailable("no sell transaction recorded".to_string())
        })?;
        let last_buy = history.last_trade(Side::Buy)?.ok_or_else(|| {
            TradeError::DataUnavailable("no buy transaction recorded".to_string())
        })?;

        let buy_prices = history.buy_prices_since(last_sell.time)?;
        let (sell_prices, weighted_sell_prices) = history.sell_prices_since(last_buy.time)?;

        let data = Data {
            time: tick.time,
            buy: tick.buy,
            sell: tick.sell,
            avg_buy: tick.wa_buy,
            avg_sell: tick.wa_sell,
            usd_balance: balance.usd,
            btc_balance: balance.btc,
            last_buy_price: last_buy.rate,
            last_buy_time: last_buy.time,
            last_sell_price: last_sell.rate,
            last_sell_time: last_sell.time,
            buy_prices,
            sell_prices,
            weighted_sell_prices,
        };

        debug!(
            "Snapshot: {} buy quotes since last sale, {} sell quotes since last purchase",
            data.buy_prices.len(),
            data.sell_prices.len()
        );
        Ok(data)
    }

    /// Highest smoothed sell quote since the last purchase
    pub fn max_weighted_sell(&self) -> Option<f64> {
        self.weighted_sell_prices.iter().copied().reduce(f64::max)
    }
}

impl std::fmt::Display for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] buy ${} (avg ${}) sell ${} (avg ${}) | USD {} BTC {} | last buy ${} @ {} | last sell ${} @ {}",
            format_time(self.time),
            self.buy,
            self.avg_buy,
            self.sell,
            self.avg_sell,
            self.usd_balance,
            self.btc_balance,
            self.last_buy_price,
            format_time(self.last_buy_time),
            self.last_sell_price,
            format_time(self.last_sell_time),
        )
    }
}
