//! Application configuration
//!
//! Loaded via the `config` crate layered over environment variables (after
//! `dotenvy::dotenv()` has populated `std::env`), the same way the teacher's
//! `AppConfig::load` composes config. Spec §6 names exactly these knobs: the
//! database DSN, the four worker intervals, and the liquidity aging
//! threshold. No other environment variables are read by the core.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,

    #[serde(default = "default_match_interval_secs")]
    pub match_interval_secs: u64,

    #[serde(default = "default_liquidity_interval_secs")]
    pub liquidity_interval_secs: u64,

    #[serde(default = "default_state_interval_secs")]
    pub state_interval_secs: u64,

    #[serde(default = "default_resolver_interval_secs")]
    pub resolver_interval_secs: u64,

    #[serde(default = "default_liquidity_aging_secs")]
    pub liquidity_aging_secs: u64,

    #[serde(default = "default_admin_port")]
    pub admin_port: u16,
}

fn default_match_interval_secs() -> u64 {
    5
}
fn default_liquidity_interval_secs() -> u64 {
    20
}
fn default_state_interval_secs() -> u64 {
    5
}
fn default_resolver_interval_secs() -> u64 {
    5
}
fn default_liquidity_aging_secs() -> u64 {
    20
}
fn default_admin_port() -> u16 {
    8090
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .set_default("match_interval_secs", default_match_interval_secs())?
            .set_default("liquidity_interval_secs", default_liquidity_interval_secs())?
            .set_default("state_interval_secs", default_state_interval_secs())?
            .set_default("resolver_interval_secs", default_resolver_interval_secs())?
            .set_default("liquidity_aging_secs", default_liquidity_aging_secs())?
            .set_default("admin_port", default_admin_port() as i64)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    pub fn match_interval(&self) -> Duration {
        Duration::from_secs(self.match_interval_secs)
    }

    pub fn liquidity_interval(&self) -> Duration {
        Duration::from_secs(self.liquidity_interval_secs)
    }

    pub fn state_interval(&self) -> Duration {
        Duration::from_secs(self.state_interval_secs)
    }

    pub fn resolver_interval(&self) -> Duration {
        Duration::from_secs(self.resolver_interval_secs)
    }

    pub fn liquidity_aging(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.liquidity_aging_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        assert_eq!(default_match_interval_secs(), 5);
        assert_eq!(default_liquidity_interval_secs(), 20);
        assert_eq!(default_state_interval_secs(), 5);
        assert_eq!(default_resolver_interval_secs(), 5);
        assert_eq!(default_liquidity_aging_secs(), 20);
    }
}
