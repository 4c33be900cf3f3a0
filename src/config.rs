//! Runtime configuration
//!
//! Everything is read from environment variables (a `.env` file is loaded
//! first when present). Each value has a default except `REDIS_URL`, which
//! enables the event subscriber only when set.

use crate::error::{AppError, Result};
use crate::models::CoinList;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://crypto_stats.db";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CHANNEL: &str = "crypto_update";
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DEVIATION_WINDOW: usize = 100;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Store connection string
    pub database_url: String,
    /// Message bus connection string; `None` disables the subscriber
    pub redis_url: Option<String>,
    pub port: u16,
    pub coins: CoinList,
    /// Pub/sub channel carrying trigger messages
    pub channel: String,
    pub coingecko_base_url: String,
    /// Timeout applied to every price source request
    pub request_timeout: Duration,
    /// Periodic fetch interval; `None` disables the fetch worker
    pub fetch_interval: Option<Duration>,
    /// Number of most recent observations used by the deviation query
    pub deviation_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: None,
            port: DEFAULT_PORT,
            coins: CoinList::default(),
            channel: DEFAULT_CHANNEL.to_string(),
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fetch_interval: None,
            deviation_window: DEFAULT_DEVIATION_WINDOW,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine, the real environment still applies
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let port = match get("PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid PORT '{}': {}", v, e)))?,
            None => defaults.port,
        };

        let coins = match get("CRYPTO_COINS") {
            Some(v) => CoinList::parse(&v).map_err(AppError::Config)?,
            None => defaults.coins,
        };

        let request_timeout = match get("PRICE_SOURCE_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive("PRICE_SOURCE_TIMEOUT_SECS", &v)?),
            None => defaults.request_timeout,
        };

        let fetch_interval = match get("FETCH_INTERVAL_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(e) => {
                    return Err(AppError::Config(format!(
                        "Invalid FETCH_INTERVAL_SECS '{}': {}",
                        v, e
                    )))
                }
            },
            None => None,
        };

        let deviation_window = match get("DEVIATION_WINDOW") {
            Some(v) => parse_positive("DEVIATION_WINDOW", &v)? as usize,
            None => defaults.deviation_window,
        };

        let coingecko_base_url = get("COINGECKO_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.coingecko_base_url);

        if !coingecko_base_url.starts_with("http://") && !coingecko_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid COINGECKO_BASE_URL: must start with http:// or https://, got: '{}'",
                coingecko_base_url
            )));
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            redis_url: get("REDIS_URL"),
            port,
            coins,
            channel: get("CRYPTO_UPDATE_CHANNEL").unwrap_or(defaults.channel),
            coingecko_base_url,
            request_timeout,
            fetch_interval,
            deviation_window,
        })
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(AppError::Config(format!("{} must be greater than zero", key))),
        Err(e) => Err(AppError::Config(format!("Invalid {} '{}': {}", key, value, e))),
    }
}
