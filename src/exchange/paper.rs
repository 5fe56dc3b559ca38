//! Paper exchange
//!
//! In-memory simulation of the exchange used for dry runs. Limit orders fill
//! when they are marketable against the current quotes: a sell at or below
//! the bid, a buy at or above the ask. Fills are applied lazily whenever the
//! balance is read, optionally capped per poll to model partial fills.

use chrono::Utc;
use std::cell::RefCell;
use std::collections::VecDeque;
use tracing::debug;

use super::Exchange;
use crate::error::{Result, TradeError};
use crate::types::{Balance, OpenOrder, OrderAck, Side, Ticker, UserTransaction};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperOrder {
    pub id: u64,
    pub side: Side,
    pub amount: f64,
    pub price: f64,
}

#[derive(Debug)]
struct PaperState {
    ticker: Ticker,
    /// Quotes served by successive `current_price` calls before falling back to `ticker`
    price_path: VecDeque<Ticker>,
    usd: f64,
    btc: f64,
    fee: f64,
    fill_per_poll: Option<f64>,
    next_id: u64,
    clock: i64,
    open: Vec<PaperOrder>,
    placed: Vec<PaperOrder>,
    cancelled: Vec<u64>,
    transactions: Vec<UserTransaction>,
}

#[derive(Debug)]
pub struct PaperExchange {
    state: RefCell<PaperState>,
}

impl PaperExchange {
    pub fn new(ticker: Ticker, balance: Balance) -> Self {
        PaperExchange {
            state: RefCell::new(PaperState {
                ticker,
                price_path: VecDeque::new(),
                usd: balance.usd,
                btc: balance.btc,
                fee: balance.fee,
                fill_per_poll: None,
                next_id: 1,
                clock: Utc::now().timestamp(),
                open: Vec::new(),
                placed: Vec::new(),
                cancelled: Vec::new(),
                transactions: Vec::new(),
            }),
        }
    }

    /// Cap how much BTC a single order may fill per balance poll
    pub fn with_fill_per_poll(self, btc: f64) -> Self {
        self.state.borrow_mut().fill_per_poll = Some(btc);
        self
    }

    /// Start the fill clock (transaction timestamps) at `time`
    pub fn with_clock(self, time: i64) -> Self {
        self.state.borrow_mut().clock = time;
        self
    }

    pub fn set_price(&self, ticker: Ticker) {
        let mut state = self.state.borrow_mut();
        state.price_path.clear();
        state.ticker = ticker;
    }

    /// Serve these quotes one per `current_price` call; the last one sticks
    pub fn script_prices(&self, path: impl IntoIterator<Item = Ticker>) {
        let mut state = self.state.borrow_mut();
        state.price_path = path.into_iter().collect();
    }

    /// Every order placed so far, in order
    pub fn placed_orders(&self) -> Vec<PaperOrder> {
        self.state.borrow().placed.clone()
    }

    pub fn open_paper_orders(&self) -> Vec<PaperOrder> {
        self.state.borrow().open.clone()
    }

    pub fn cancelled_orders(&self) -> Vec<u64> {
        self.state.borrow().cancelled.clone()
    }

    fn place(&self, side: Side, amount: f64, price: f64) -> Result<OrderAck> {
        if amount <= 0.0 || price <= 0.0 {
            return Err(TradeError::Api(format!(
                "invalid {} order: {} BTC @ ${}",
                side, amount, price
            )));
        }

        let mut state = self.state.borrow_mut();
        let cost = amount * price * (1.0 + state.fee / 100.0);
        match side {
            Side::Buy if cost > state.usd + 1e-9 => {
                return Err(TradeError::Api(format!(
                    "insufficient USD: need {:.2}, have {:.2}",
                    cost, state.usd
                )));
            }
            Side::Sell if amount > state.btc + 1e-12 => {
                return Err(TradeError::Api(format!(
                    "insufficient BTC: need {}, have {}",
                    amount, state.btc
                )));
            }
            _ => {}
        }

        let order = PaperOrder {
            id: state.next_id,
            side,
            amount,
            price,
        };
        state.next_id += 1;
        state.open.push(order);
        state.placed.push(order);
        debug!("Paper {} order {}: {} BTC @ ${}", side, order.id, amount, price);

        Ok(OrderAck {
            id: order.id,
            side,
            amount,
            price,
        })
    }
}

impl PaperState {
    fn fill_marketable(&mut self) {
        let ticker = self.ticker;
        let fee = self.fee / 100.0;
        let cap = self.fill_per_poll;
        let mut fills = Vec::new();

        for order in self.open.iter_mut() {
            let marketable = match order.side {
                Side::Sell => order.price <= ticker.sell,
                Side::Buy => order.price >= ticker.buy,
            };
            if !marketable {
                continue;
            }
            let qty = cap.map_or(order.amount, |c| c.min(order.amount));
            order.amount -= qty;
            fills.push((order.side, qty, order.price));
        }
        self.open.retain(|o| o.amount > 1e-12);

        for (side, qty, price) in fills {
            let gross = qty * price;
            let tx = match side {
                Side::Sell => {
                    let proceeds = gross * (1.0 - fee);
                    self.btc -= qty;
                    self.usd += proceeds;
                    UserTransaction { time: self.clock, usd: proceeds, btc: -qty, rate: price }
                }
                Side::Buy => {
                    let cost = gross * (1.0 + fee);
                    self.btc += qty;
                    self.usd -= cost;
                    UserTransaction { time: self.clock, usd: -cost, btc: qty, rate: price }
                }
            };
            self.clock += 1;
            self.transactions.push(tx);
        }

        if self.btc.abs() < 1e-12 {
            self.btc = 0.0;
        }
    }
}

impl Exchange for PaperExchange {
    fn current_price(&self) -> Result<Ticker> {
        let mut state = self.state.borrow_mut();
        if let Some(next) = state.price_path.pop_front() {
            state.ticker = next;
        }
        Ok(state.ticker)
    }

    fn balance(&self) -> Result<Balance> {
        let mut state = self.state.borrow_mut();
        state.fill_marketable();
        Ok(Balance {
            usd: state.usd,
            btc: state.btc,
            fee: state.fee,
        })
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>> {
        Ok(self
            .state
            .borrow()
            .open
            .iter()
            .map(|o| OpenOrder { id: o.id })
            .collect())
    }

    fn cancel_order(&self, id: u64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let before = state.open.len();
        state.open.retain(|o| o.id != id);
        if state.open.len() == before {
            return Err(TradeError::Api(format!("order {} not found", id)));
        }
        state.cancelled.push(id);
        Ok(())
    }

    fn buy_order(&self, amount: f64, price: f64) -> Result<OrderAck> {
        self.place(Side::Buy, amount, price)
    }

    fn sell_order(&self, amount: f64, price: f64) -> Result<OrderAck> {
        self.place(Side::Sell, amount, price)
    }

    fn transactions(&self) -> Result<Vec<UserTransaction>> {
        Ok(self.state.borrow().transactions.iter().rev().copied().collect())
    }
}
