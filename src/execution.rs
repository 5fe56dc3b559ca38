//! Order execution loops
//!
//! `purge` sells the whole BTC balance and `acquire` spends the whole USD
//! balance. Both keep a single limit order on the book, replace it when the
//! market moves past the configured tolerance in the direction that would
//! leave it stranded, and give up (cancelling it) when the market moves the
//! other way, so the next cycle can re-evaluate. Both block the calling thread
//! until they finish.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ExecutionConfig;
use crate::error::Result;
use crate::exchange::Exchange;
use crate::money::{btc_for_usd, chop_btc};
use crate::types::OrderAck;

/// Pause between loop iterations
pub trait Sleep {
    fn sleep(&self, interval: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Returns immediately, for simulated runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSleep;

impl Sleep for NoSleep {
    fn sleep(&self, _interval: Duration) {}
}

/// How an execution loop ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionOutcome {
    /// The balance was fully sold or spent
    Completed { iterations: u32, orders_placed: u32 },
    /// The price drifted past tolerance; open orders were cancelled and
    /// nothing was re-placed
    Aborted {
        reference_price: f64,
        current_price: f64,
        iterations: u32,
    },
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }
}

pub struct OrderExecutor {
    config: ExecutionConfig,
    sleeper: Box<dyn Sleep>,
}

impl OrderExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self::with_sleeper(config, Box::new(ThreadSleep))
    }

    pub fn with_sleeper(config: ExecutionConfig, sleeper: Box<dyn Sleep>) -> Self {
        OrderExecutor { config, sleeper }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Sell all BTC as quickly as possible
    pub fn purge(&self, exchange: &dyn Exchange) -> Result<ExecutionOutcome> {
        info!("Beginning purge");

        // Infinite so the first iteration always places an order
        let mut reference = f64::INFINITY;
        let mut iterations = 0;
        let mut orders_placed = 0;

        loop {
            let btc = exchange.balance()?.btc;
            if btc < self.config.min_btc_order {
                info!(
                    "All BTC sold. Purge ends after {} iterations ({} orders)",
                    iterations, orders_placed
                );
                return Ok(ExecutionOutcome::Completed {
                    iterations,
                    orders_placed,
                });
            }

            iterations += 1;
            let sell = exchange.current_price()?.sell;
            debug!(
                "Purge #{}: remaining {} BTC, previous sell ${}, current sell ${}",
                iterations, btc, reference, sell
            );

            if sell < self.config.sell_price_drop_factor * reference {
                // A resting order above the bid will not fill, so chase the price down
                exchange.cancel_all_orders()?;
                exchange.sell_order(chop_btc(btc), sell)?;
                reference = sell;
                orders_placed += 1;
            } else if sell > self.config.sell_price_rise_factor * reference {
                warn!(
                    "Sell price ${} rose past {} x ${}. Cancelling purge",
                    sell, self.config.sell_price_rise_factor, reference
                );
                exchange.cancel_all_orders()?;
                return Ok(ExecutionOutcome::Aborted {
                    reference_price: reference,
                    current_price: sell,
                    iterations,
                });
            }

            self.sleeper.sleep(self.config.transaction_interval());
        }
    }

    /// Spend all USD on BTC as quickly as possible
    pub fn acquire(&self, exchange: &dyn Exchange) -> Result<ExecutionOutcome> {
        info!("Beginning acquire");

        // Zero so the first iteration always places an order
        let mut reference = 0.0;
        let mut iterations = 0;
        let mut orders_placed = 0;

        loop {
            let balance = exchange.balance()?;
            if balance.usd < self.config.min_usd_order {
                info!(
                    "All USD spent. Acquire ends after {} iterations ({} orders)",
                    iterations, orders_placed
                );
                return Ok(ExecutionOutcome::Completed {
                    iterations,
                    orders_placed,
                });
            }

            let buy = exchange.current_price()?.buy;
            let btc = btc_for_usd(balance.usd, balance.fee, buy);
            if btc < self.config.min_btc_order {
                info!(
                    "Remaining ${} buys less than the minimum amount. Acquire ends",
                    balance.usd
                );
                return Ok(ExecutionOutcome::Completed {
                    iterations,
                    orders_placed,
                });
            }

            iterations += 1;
            debug!(
                "Acquire #{}: remaining ${} (fee {}%), previous buy ${}, current buy ${}, buying {} BTC",
                iterations, balance.usd, balance.fee, reference, buy, btc
            );

            if buy > self.config.buy_price_rise_factor * reference {
                // A resting order below the ask will not fill, so chase the price up
                exchange.cancel_all_orders()?;
                exchange.buy_order(btc, buy)?;
                reference = buy;
                orders_placed += 1;
            } else if buy < self.config.buy_price_drop_factor * reference {
                warn!(
                    "Buy price ${} fell past {} x ${}. Cancelling acquire",
                    buy, self.config.buy_price_drop_factor, reference
                );
                exchange.cancel_all_orders()?;
                return Ok(ExecutionOutcome::Aborted {
                    reference_price: reference,
                    current_price: buy,
                    iterations,
                });
            }

            self.sleeper.sleep(self.config.transaction_interval());
        }
    }

    /// Place a buy order at `price` whose total cost, fee included, stays
    /// within `usd`. Returns `None` when `usd` buys less than the minimum amount.
    pub fn usd_buy_order(
        &self,
        exchange: &dyn Exchange,
        usd: f64,
        price: f64,
    ) -> Result<Option<OrderAck>> {
        let fee = exchange.balance()?.fee;
        let btc = btc_for_usd(usd, fee, price);
        if btc < self.config.min_btc_order {
            warn!("${} is too little to buy BTC at ${}", usd, price);
            return Ok(None);
        }

        info!("Buying {} BTC at ${} at a cost of ${}", btc, price, usd);
        exchange.buy_order(btc, price).map(Some)
    }
}
