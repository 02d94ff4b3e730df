use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub data_dir: String,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8080"),
            database_url: read_secret("DATABASE_URL")
                .unwrap_or_else(|| try_load("DATABASE_URL", "sqlite://data/contests.db?mode=rwc")),
            data_dir: try_load("DATA_DIR", "data"),
            sweep_interval: sweep_interval(try_load("SWEEP_INTERVAL_SECS", "5")),
        }
    }
}

/// Never zero, a zero period would stall the sweeper.
fn sweep_interval(secs: u64) -> Duration {
    if secs == 0 {
        warn!("SWEEP_INTERVAL_SECS must be at least 1, using 1");
    }

    Duration::from_secs(secs.max(1))
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Docker secret, when mounted. Falls back to the environment otherwise.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret mounted ({e})");
        })
        .ok()
}
