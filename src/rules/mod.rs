//! Trading rules
//!
//! Each rule is a [`Decision`] built from a condition and an action. They are
//! evaluated in priority order:
//!
//! 1. Absolute Zero - sell everything below a hard price floor
//! 2. Minimize Loss - stop-loss relative to the last purchase
//! 3. Minimum Profit - take a modest profit once a better one was missed
//! 4. Rising Peak - trailing sell band above an activation threshold
//! 5. Falling Trench - trailing buy band below an activation threshold
//!
//! All tunables live in [`RuleParams`]. Values stored in the band store
//! override the configured defaults, so they can be changed between cycles
//! without touching the config file.

pub mod absolute_zero;
pub mod falling_trench;
pub mod minimize_loss;
pub mod minimum_profit;
pub mod rising_peak;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decision::{Context, Decision};
use crate::error::Result;
use crate::store::BandStore;

/// Band store key of the Rising Peak band
pub const RISING_PEAK_BAND: &str = "rising_peak_band";
/// Band store key of the Falling Trench band
pub const FALLING_TRENCH_BAND: &str = "falling_trench_band";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    AbsoluteZero,
    MinimizeLoss,
    MinimumProfit,
    RisingPeak,
    FallingTrench,
}

impl Rule {
    /// Priority order
    pub const ALL: [Rule; 5] = [
        Rule::AbsoluteZero,
        Rule::MinimizeLoss,
        Rule::MinimumProfit,
        Rule::RisingPeak,
        Rule::FallingTrench,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::AbsoluteZero => "absolute_zero",
            Rule::MinimizeLoss => "minimize_loss",
            Rule::MinimumProfit => "min_profit",
            Rule::RisingPeak => "rising_peak",
            Rule::FallingTrench => "falling_trench",
        }
    }

    /// Band store key of the enable flag
    pub fn flag_key(&self) -> &'static str {
        match self {
            Rule::AbsoluteZero => "active_absolute_zero",
            Rule::MinimizeLoss => "active_minimize_loss",
            Rule::MinimumProfit => "active_min_profit",
            Rule::RisingPeak => "active_rising_peak",
            Rule::FallingTrench => "active_falling_trench",
        }
    }

    /// Accepts either the rule name or its flag key
    pub fn from_name(name: &str) -> Option<Rule> {
        Rule::ALL
            .into_iter()
            .find(|rule| rule.name() == name || rule.flag_key() == name)
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rule tunables and enable flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParams {
    /// Sell price below which everything is liquidated
    pub absolute_zero_min_threshold: f64,
    /// Factor of the last buy price that triggers a stop-loss
    pub minimize_loss_drop_factor: f64,
    pub min_profit_band_lower_factor: f64,
    pub min_profit_band_upper_factor: f64,
    /// Smoothed peak (x last buy) that arms Minimum Profit
    pub min_profit_trigger_threshold: f64,
    /// Average sell above which the peak band is created
    pub rising_peak_activation_threshold: f64,
    pub rising_peak_upper_limit_factor: f64,
    /// Average buy below which the trench band is created
    pub falling_trench_activation_threshold: f64,
    pub falling_trench_lower_limit_factor: f64,
    /// USD needed before Falling Trench considers buying
    pub falling_trench_min_usd: f64,

    pub active_absolute_zero: bool,
    pub active_minimize_loss: bool,
    pub active_min_profit: bool,
    pub active_rising_peak: bool,
    pub active_falling_trench: bool,
}

impl Default for RuleParams {
    fn default() -> Self {
        RuleParams {
            absolute_zero_min_threshold: 380.0,
            minimize_loss_drop_factor: 0.97,
            min_profit_band_lower_factor: 1.008,
            min_profit_band_upper_factor: 1.02,
            min_profit_trigger_threshold: 1.025,
            rising_peak_activation_threshold: 415.0,
            rising_peak_upper_limit_factor: 1.01,
            falling_trench_activation_threshold: 410.0,
            falling_trench_lower_limit_factor: 0.99,
            falling_trench_min_usd: 10.0,
            active_absolute_zero: true,
            active_minimize_loss: true,
            active_min_profit: true,
            active_rising_peak: true,
            active_falling_trench: true,
        }
    }
}

impl RuleParams {
    /// Names of the numeric tunables, as stored in the band store
    pub const KEYS: [&'static str; 10] = [
        "absolute_zero_min_threshold",
        "minimize_loss_drop_factor",
        "min_profit_band_lower_factor",
        "min_profit_band_upper_factor",
        "min_profit_trigger_threshold",
        "rising_peak_activation_threshold",
        "rising_peak_upper_limit_factor",
        "falling_trench_activation_threshold",
        "falling_trench_lower_limit_factor",
        "falling_trench_min_usd",
    ];

    pub fn get(&self, key: &str) -> Option<f64> {
        let value = match key {
            "absolute_zero_min_threshold" => self.absolute_zero_min_threshold,
            "minimize_loss_drop_factor" => self.minimize_loss_drop_factor,
            "min_profit_band_lower_factor" => self.min_profit_band_lower_factor,
            "min_profit_band_upper_factor" => self.min_profit_band_upper_factor,
            "min_profit_trigger_threshold" => self.min_profit_trigger_threshold,
            "rising_peak_activation_threshold" => self.rising_peak_activation_threshold,
            "rising_peak_upper_limit_factor" => self.rising_peak_upper_limit_factor,
            "falling_trench_activation_threshold" => self.falling_trench_activation_threshold,
            "falling_trench_lower_limit_factor" => self.falling_trench_lower_limit_factor,
            "falling_trench_min_usd" => self.falling_trench_min_usd,
            _ => return None,
        };
        Some(value)
    }

    /// Returns false for an unknown key
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        let field = match key {
            "absolute_zero_min_threshold" => &mut self.absolute_zero_min_threshold,
            "minimize_loss_drop_factor" => &mut self.minimize_loss_drop_factor,
            "min_profit_band_lower_factor" => &mut self.min_profit_band_lower_factor,
            "min_profit_band_upper_factor" => &mut self.min_profit_band_upper_factor,
            "min_profit_trigger_threshold" => &mut self.min_profit_trigger_threshold,
            "rising_peak_activation_threshold" => &mut self.rising_peak_activation_threshold,
            "rising_peak_upper_limit_factor" => &mut self.rising_peak_upper_limit_factor,
            "falling_trench_activation_threshold" => {
                &mut self.falling_trench_activation_threshold
            }
            "falling_trench_lower_limit_factor" => &mut self.falling_trench_lower_limit_factor,
            "falling_trench_min_usd" => &mut self.falling_trench_min_usd,
            _ => return false,
        };
        *field = value;
        true
    }

    pub fn is_enabled(&self, rule: Rule) -> bool {
        match rule {
            Rule::AbsoluteZero => self.active_absolute_zero,
            Rule::MinimizeLoss => self.active_minimize_loss,
            Rule::MinimumProfit => self.active_min_profit,
            Rule::RisingPeak => self.active_rising_peak,
            Rule::FallingTrench => self.active_falling_trench,
        }
    }

    pub fn set_enabled(&mut self, rule: Rule, enabled: bool) {
        let flag = match rule {
            Rule::AbsoluteZero => &mut self.active_absolute_zero,
            Rule::MinimizeLoss => &mut self.active_minimize_loss,
            Rule::MinimumProfit => &mut self.active_min_profit,
            Rule::RisingPeak => &mut self.active_rising_peak,
            Rule::FallingTrench => &mut self.active_falling_trench,
        };
        *flag = enabled;
    }

    /// Overlay the values found in `store` on top of these defaults
    pub fn resolve(&self, store: &mut dyn BandStore) -> Result<RuleParams> {
        let mut params = self.clone();
        for key in Self::KEYS {
            if let Some(value) = store.param(key)? {
                params.set(key, value);
            }
        }
        for rule in Rule::ALL {
            if let Some(enabled) = store.flag(rule.flag_key())? {
                params.set_enabled(rule, enabled);
            }
        }
        Ok(params)
    }

    /// Write every tunable and flag to `store`
    pub fn seed(&self, store: &mut dyn BandStore) -> Result<()> {
        for key in Self::KEYS {
            if let Some(value) = self.get(key) {
                store.set_param(key, value)?;
            }
        }
        for rule in Rule::ALL {
            store.set_flag(rule.flag_key(), self.is_enabled(rule))?;
        }
        info!("Stored {} rule parameters", Self::KEYS.len() + Rule::ALL.len());
        Ok(())
    }
}

/// The full rule set in priority order
pub fn initiate_decisions() -> Vec<Decision> {
    vec![
        absolute_zero::decision(),
        minimize_loss::decision(),
        minimum_profit::decision(),
        rising_peak::decision(),
        falling_trench::decision(),
    ]
}

/// Sell all BTC. Once the balance is gone the peak band is stale, and the new
/// sale is pulled into the history so the next snapshot sees it.
pub(crate) fn liquidate(rule: Rule, ctx: &mut Context<'_>) -> Result<()> {
    info!(rule = %rule, "Liquidating");
    let outcome = ctx.executor.purge(ctx.exchange)?;
    if outcome.is_completed() {
        ctx.bands.delete_band(RISING_PEAK_BAND)?;
        ctx.history.sync_transactions(ctx.exchange)?;
    }
    Ok(())
}
