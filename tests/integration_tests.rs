//! Integration tests for the OODA trader
//!
//! These tests drive whole cycles (snapshot, rule chain, execution) against
//! the paper exchange and in-memory stores.

use approx::assert_relative_eq;

use ooda_trader::exchange::PaperExchange;
use ooda_trader::execution::NoSleep;
use ooda_trader::history::HistoryStore;
use ooda_trader::rules::{initiate_decisions, RuleParams, FALLING_TRENCH_BAND, RISING_PEAK_BAND};
use ooda_trader::store::{MemoryBandStore, SqliteBandStore};
use ooda_trader::{
    Balance, Band, BandStore, Config, Context, CycleReport, Data, DecisionEngine, Exchange,
    OrderExecutor, Side, Ticker, TradeError, UserTransaction,
};

// =============================================================================
// Test Utilities
// =============================================================================

struct World {
    exchange: PaperExchange,
    bands: MemoryBandStore,
    history: HistoryStore,
    executor: OrderExecutor,
    defaults: RuleParams,
}

impl World {
    fn new(usd: f64, btc: f64, trades: &[UserTransaction]) -> Self {
        let history = HistoryStore::open_in_memory().unwrap();
        history.upsert_transactions(trades).unwrap();

        World {
            exchange: PaperExchange::new(
                Ticker { buy: 401.0, sell: 400.0 },
                Balance { usd, btc, fee: 0.5 },
            )
            .with_clock(10_000),
            bands: MemoryBandStore::new(),
            history,
            executor: OrderExecutor::with_sleeper(Default::default(), Box::new(NoSleep)),
            defaults: RuleParams::default(),
        }
    }

    /// Record a tick and move the paper market to it
    fn tick(&self, time: i64, buy: f64, sell: f64) {
        let ticker = Ticker { buy, sell };
        self.history.record_tick(time, ticker).unwrap();
        self.exchange.set_price(ticker);
    }

    fn cycle(&mut self) -> CycleReport {
        let data = Data::observe(&self.history, &self.exchange).unwrap();
        let params = self.defaults.resolve(&mut self.bands).unwrap();
        let mut engine = DecisionEngine::new(initiate_decisions());

        let mut ctx = Context {
            exchange: &self.exchange,
            bands: &mut self.bands,
            history: &self.history,
            executor: &self.executor,
            params: &params,
        };
        engine.run(&data, &mut ctx).unwrap()
    }
}

fn buy_tx(time: i64, rate: f64) -> UserTransaction {
    UserTransaction { time, usd: -rate, btc: 1.0, rate }
}

fn sell_tx(time: i64, rate: f64) -> UserTransaction {
    UserTransaction { time, usd: rate, btc: -1.0, rate }
}

// =============================================================================
// Rising Peak
// =============================================================================

#[test]
fn test_rising_peak_full_lifecycle() {
    let mut world = World::new(0.0, 1.0, &[sell_tx(50, 390.0), buy_tx(100, 400.0)]);
    world.tick(200, 421.0, 420.0);
    world.tick(300, 426.0, 425.0);
    world.tick(400, 431.0, 430.0);

    // Activation: band above the threshold, order resting at the upper edge
    let report = world.cycle();
    assert!(report.matched.is_empty());
    let band = world.bands.band(RISING_PEAK_BAND).unwrap().unwrap();
    assert_eq!(band.lower, 415.0);
    assert_relative_eq!(band.upper, 434.3);
    assert_relative_eq!(world.exchange.open_paper_orders()[0].price, 434.3);

    // Ratchet: the price rises, the band follows
    world.tick(500, 433.0, 432.0);
    let report = world.cycle();
    assert!(report.matched.is_empty());
    let raised = world.bands.band(RISING_PEAK_BAND).unwrap().unwrap();
    assert_relative_eq!(raised.lower, 417.02);
    assert_relative_eq!(raised.upper, 436.32);
    assert_eq!(world.exchange.open_paper_orders().len(), 1);
    assert_relative_eq!(world.exchange.open_paper_orders()[0].price, 436.32);

    // Break: the price falls through the lower edge, everything is sold
    world.tick(600, 417.0, 416.0);
    let report = world.cycle();
    assert_eq!(report.matched, vec!["rising_peak"]);
    assert_eq!(report.halted_by.as_deref(), Some("rising_peak"));

    assert_eq!(world.exchange.balance().unwrap().btc, 0.0);
    assert_eq!(world.bands.band(RISING_PEAK_BAND).unwrap(), None);
    let last_sell = world.history.last_trade(Side::Sell).unwrap().unwrap();
    assert_eq!(last_sell.rate, 416.0);
    assert!(last_sell.time >= 10_000);
}

#[test]
fn test_rising_peak_band_dropped_after_resting_sell_fills() {
    let mut world = World::new(0.0, 1.0, &[sell_tx(50, 390.0), buy_tx(100, 400.0)]);
    world.tick(200, 421.0, 420.0);
    world.tick(300, 426.0, 425.0);
    world.tick(400, 431.0, 430.0);
    world.cycle();
    assert!(world.bands.band(RISING_PEAK_BAND).unwrap().is_some());

    // Spike through the upper edge: the resting sell fills, nothing left to track
    world.tick(500, 446.0, 445.0);
    let report = world.cycle();
    assert!(report.matched.is_empty());
    assert_eq!(world.exchange.balance().unwrap().btc, 0.0);
    assert_eq!(world.bands.band(RISING_PEAK_BAND).unwrap(), None);

    // Buy back in below the old band
    world.tick(600, 400.0, 399.0);
    assert!(world.executor.acquire(&world.exchange).unwrap().is_completed());
    let rebought = world.exchange.balance().unwrap().btc;
    assert!(rebought > 1.0);

    let report = world.cycle();
    assert!(report.matched.is_empty());
    assert_eq!(world.exchange.balance().unwrap().btc, rebought);
    assert!(world
        .exchange
        .placed_orders()
        .iter()
        .all(|o| o.side == Side::Buy || o.price > 399.0));
}

#[test]
fn test_rising_peak_disabled_by_stored_flag() {
    let mut world = World::new(0.0, 1.0, &[sell_tx(50, 390.0), buy_tx(100, 400.0)]);
    world.bands.set_flag("active_rising_peak", false).unwrap();
    world.tick(200, 431.0, 430.0);

    world.cycle();

    assert_eq!(world.bands.band(RISING_PEAK_BAND).unwrap(), None);
    assert!(world.exchange.placed_orders().is_empty());
}

#[test]
fn test_stored_threshold_overrides_default() {
    let mut world = World::new(0.0, 1.0, &[sell_tx(50, 390.0), buy_tx(100, 400.0)]);
    world
        .bands
        .set_param("rising_peak_activation_threshold", 440.0)
        .unwrap();
    world.tick(200, 431.0, 430.0);

    world.cycle();

    assert_eq!(world.bands.band(RISING_PEAK_BAND).unwrap(), None);
}

// =============================================================================
// Priority and short-circuit
// =============================================================================

#[test]
fn test_minimize_loss_preempts_rising_peak() {
    let mut world = World::new(0.0, 1.0, &[sell_tx(50, 480.0), buy_tx(100, 500.0)]);
    world
        .bands
        .set_band(RISING_PEAK_BAND, &Band::new(475.0, 490.0))
        .unwrap();
    world.tick(200, 471.0, 470.0);

    let report = world.cycle();

    assert_eq!(report.matched, vec!["minimize_loss"]);
    assert_eq!(report.halted_by.as_deref(), Some("minimize_loss"));
    // only the purge order, nothing from Rising Peak
    let placed = world.exchange.placed_orders();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].price, 470.0);
    assert_eq!(world.exchange.balance().unwrap().btc, 0.0);
    assert_eq!(world.bands.band(RISING_PEAK_BAND).unwrap(), None);
}

#[test]
fn test_absolute_zero_liquidates() {
    let mut world = World::new(0.0, 2.5, &[sell_tx(50, 390.0), buy_tx(100, 385.0)]);
    world.tick(200, 376.0, 375.0);

    let report = world.cycle();

    assert_eq!(report.halted_by.as_deref(), Some("absolute_zero"));
    assert_eq!(world.exchange.balance().unwrap().btc, 0.0);
    assert_relative_eq!(world.exchange.balance().unwrap().usd, 2.5 * 375.0 * 0.995);
}

#[test]
fn test_quiet_market_evaluates_every_rule() {
    let mut world = World::new(5.0, 0.0, &[buy_tx(50, 420.0), sell_tx(100, 430.0)]);
    world.tick(200, 413.0, 412.0);

    let data = Data::observe(&world.history, &world.exchange).unwrap();
    let params = world.defaults.resolve(&mut world.bands).unwrap();
    let mut engine = DecisionEngine::new(initiate_decisions());
    let mut ctx = Context {
        exchange: &world.exchange,
        bands: &mut world.bands,
        history: &world.history,
        executor: &world.executor,
        params: &params,
    };

    let report = engine.run(&data, &mut ctx).unwrap();

    assert_eq!(report, CycleReport::default());
    assert_eq!(engine.decisions().len(), 5);
    assert!(engine.decisions().iter().all(|d| !d.triggered()));
    assert!(world.exchange.placed_orders().is_empty());
}

// =============================================================================
// Falling Trench
// =============================================================================

#[test]
fn test_falling_trench_full_lifecycle() {
    let mut world = World::new(1000.0, 0.0, &[buy_tx(50, 420.0), sell_tx(100, 430.0)]);
    world.tick(200, 405.0, 404.0);
    world.tick(300, 400.0, 399.0);

    // Activation: buy order for the whole balance resting at the lower edge
    let report = world.cycle();
    assert!(report.matched.is_empty());
    let band = world.bands.band(FALLING_TRENCH_BAND).unwrap().unwrap();
    assert_relative_eq!(band.lower, 396.0);
    assert_eq!(band.upper, 410.0);
    let resting = world.exchange.open_paper_orders();
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].side, Side::Buy);
    assert_eq!(resting[0].price, 396.0);

    // Recovery above the upper edge: spend the USD
    world.tick(400, 412.0, 411.0);
    let report = world.cycle();
    assert_eq!(report.halted_by.as_deref(), Some("falling_trench"));

    let balance = world.exchange.balance().unwrap();
    assert!(balance.usd < 1.0);
    assert!(balance.btc > 2.4);
    assert_eq!(world.bands.band(FALLING_TRENCH_BAND).unwrap(), None);
    assert_eq!(
        world.history.last_trade(Side::Buy).unwrap().unwrap().rate,
        412.0
    );
}

#[test]
fn test_falling_trench_band_dropped_after_resting_buy_fills() {
    let mut world = World::new(1000.0, 0.0, &[buy_tx(50, 370.0), sell_tx(100, 430.0)]);
    world.tick(200, 405.0, 404.0);
    world.tick(300, 400.0, 399.0);
    world.cycle();
    assert!(world.bands.band(FALLING_TRENCH_BAND).unwrap().is_some());

    // Ask touches the lower edge: the resting buy fills and the USD is gone
    world.tick(400, 396.0, 395.0);
    let report = world.cycle();
    assert!(report.matched.is_empty());
    assert!(world.exchange.balance().unwrap().usd <= 10.0);
    assert_eq!(world.bands.band(FALLING_TRENCH_BAND).unwrap(), None);

    // Sell out above the old band's upper edge
    world.tick(500, 413.0, 412.0);
    assert!(world.executor.purge(&world.exchange).unwrap().is_completed());
    let usd = world.exchange.balance().unwrap().usd;
    assert!(usd > 1000.0);

    let report = world.cycle();
    assert!(report.matched.is_empty());
    assert_eq!(world.exchange.balance().unwrap().usd, usd);
}

// =============================================================================
// Snapshot, configuration and storage
// =============================================================================

#[test]
fn test_cycle_needs_history() {
    let world = World::new(0.0, 1.0, &[]);
    world.tick(200, 431.0, 430.0);

    let err = Data::observe(&world.history, &world.exchange).unwrap_err();
    assert!(matches!(err, TradeError::DataUnavailable(_)));
}

#[test]
fn test_config_sections_default_independently() {
    let config: Config = serde_json::from_str(
        r#"{
            "storage": { "band_backend": "redis" },
            "execution": { "transaction_interval_secs": 3 },
            "rules": { "falling_trench_min_usd": 50, "active_min_profit": false }
        }"#,
    )
    .unwrap();

    assert_eq!(config.exchange.base_url, "https://www.bitstamp.net");
    assert_eq!(config.storage.redis_url, "redis://127.0.0.1:6379/0");
    assert_eq!(config.execution.transaction_interval_secs, 3);
    assert_eq!(config.execution.sell_price_drop_factor, 0.9975);
    assert_eq!(config.rules.falling_trench_min_usd, 50.0);
    assert!(!config.rules.active_min_profit);
    assert_eq!(config.rules.rising_peak_activation_threshold, 415.0);
}

#[test]
fn test_sqlite_state_survives_reopen() {
    let path = std::env::temp_dir().join(format!("ooda_state_{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let mut store = SqliteBandStore::open(&path).unwrap();
        store
            .set_band(FALLING_TRENCH_BAND, &Band::new(396.0, 410.0))
            .unwrap();
        RuleParams::default().seed(&mut store).unwrap();
    }

    let mut store = SqliteBandStore::open(&path).unwrap();
    assert_eq!(
        store.band(FALLING_TRENCH_BAND).unwrap(),
        Some(Band::new(396.0, 410.0))
    );
    assert_eq!(
        RuleParams::default().resolve(&mut store).unwrap(),
        RuleParams::default()
    );

    let _ = std::fs::remove_file(&path);
}
