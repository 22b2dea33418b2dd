use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,

    /// Snapshot file for the in-memory store.
    pub local_store_path: Option<PathBuf>,

    /// Enables the joined-wallet cache.
    pub redis_url: Option<String>,

    pub bind_address: SocketAddr,

    /// Simulated wait for a payout to confirm.
    pub payout_confirmation: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            local_store_path: None,
            redis_url: None,
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            payout_confirmation: Duration::from_millis(1500),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_address = match non_empty("BIND_ADDRESS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDRESS",
                value,
            })?,
            None => defaults.bind_address,
        };

        let payout_confirmation = match non_empty("PAYOUT_CONFIRMATION_MS") {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    name: "PAYOUT_CONFIRMATION_MS",
                    value,
                })?,
            None => defaults.payout_confirmation,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            local_store_path: non_empty("LOCAL_STORE_PATH").map(PathBuf::from),
            redis_url: non_empty("REDIS_URL"),
            bind_address,
            payout_confirmation,
        })
    }
}
