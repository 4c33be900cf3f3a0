//! CoinGecko market data client
//!
//! Fetches current price, market cap and 24h change for a set of coin ids in
//! a single `/coins/markets` request:
//!
//! ```text
//! GET {base}/coins/markets?vs_currency=usd&ids=bitcoin,ethereum
//! ```
//!
//! CoinGecko returns `null` for fields it has no value for (new listings
//! commonly lack `price_change_percentage_24h`), so every numeric field is
//! optional here and validation happens when the collector builds
//! observations.

use crate::error::Error;
use crate::models::CoinList;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

/// One entry of the `/coins/markets` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Source of current market data for a set of coins
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_markets(&self, coins: &CoinList) -> Result<Vec<CoinMarket>, Error>;
}

pub struct CoinGeckoClient {
    base_url: String,
    client: Client,
}

impl CoinGeckoClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. "https://api.coingecko.com/api/v3"
    /// * `timeout` - Applied to each request (connect + response)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Invalid base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cryptostats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Created CoinGeckoClient: base_url='{}', timeout={}s",
            base_url,
            timeout.as_secs()
        );

        Ok(Self { base_url, client })
    }

    fn markets_url(&self) -> String {
        format!("{}/coins/markets", self.base_url)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_markets(&self, coins: &CoinList) -> Result<Vec<CoinMarket>, Error> {
        if coins.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.markets_url();
        let ids = coins.joined();
        debug!("Fetching markets from CoinGecko: url={}, ids={}", url, ids);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[("vs_currency", "usd"), ("ids", ids.as_str())])
            .send()
            .await
            .map_err(|e| {
                let error_msg = format!("CoinGecko request failed: {} (url: {})", e, url);
                error!("{}", error_msg);
                Error::Network(error_msg)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(Error::Network(format!(
                "CoinGecko returned error status {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))?;

        let markets = parse_markets(&body)?;
        info!("Fetched {} market entries from CoinGecko", markets.len());
        Ok(markets)
    }
}

/// Parse a `/coins/markets` response body
pub fn parse_markets(body: &str) -> Result<Vec<CoinMarket>, Error> {
    serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("Failed to parse CoinGecko response: {}", e)))
}
