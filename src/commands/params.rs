//! Params command: inspect and edit the stored rule tunables

use anyhow::{bail, Result};
use tracing::info;

use ooda_trader::rules::{Rule, RuleParams};

pub fn dump(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let mut store = super::open_band_store(&config)?;
    let params = config.rules.resolve(store.as_mut())?;

    println!("{}", serde_json::to_string_pretty(&params)?);

    println!("\nStored entries:");
    for (key, value) in store.entries()? {
        println!("  {} = {}", key, value);
    }
    Ok(())
}

pub fn set(config_path: &str, key: &str, value: f64) -> Result<()> {
    if RuleParams::default().get(key).is_none() {
        bail!(
            "Unknown parameter: {}. Available: {}",
            key,
            RuleParams::KEYS.join(", ")
        );
    }

    let config = super::load_config(config_path)?;
    let mut store = super::open_band_store(&config)?;
    store.set_param(key, value)?;
    info!("Set {} = {}", key, value);
    Ok(())
}

pub fn toggle(config_path: &str, name: &str) -> Result<()> {
    let Some(rule) = Rule::from_name(name) else {
        let names: Vec<&str> = Rule::ALL.iter().map(|r| r.flag_key()).collect();
        bail!("Unknown rule flag: {}. Available: {}", name, names.join(", "));
    };

    let config = super::load_config(config_path)?;
    let mut store = super::open_band_store(&config)?;
    let enabled = !config.rules.resolve(store.as_mut())?.is_enabled(rule);
    store.set_flag(rule.flag_key(), enabled)?;

    println!("{} = {}", rule.flag_key(), enabled);
    Ok(())
}

/// Store every configured default
pub fn load(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let mut store = super::open_band_store(&config)?;
    config.rules.seed(store.as_mut())?;
    Ok(())
}
