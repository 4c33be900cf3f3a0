//! Fetch-and-store
//!
//! The single unit of work shared by the HTTP trigger, the event subscriber,
//! the periodic worker and the `fetch` command: one price source request for
//! the configured coins, one batch insert into the stat store.

use crate::error::Result;
use crate::models::{CoinList, Observation};
use crate::services::coingecko::{CoinMarket, PriceSource};
use crate::services::health::SharedHealthStats;
use crate::services::stat_store::StatStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Outcome of one successful fetch-and-store run
#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    /// Number of observations written
    pub stored: usize,
    /// Coin ids written, in response order
    pub coins: Vec<String>,
    /// Coin ids dropped because the upstream entry was incomplete
    pub skipped: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

pub struct StatsCollector {
    source: Arc<dyn PriceSource>,
    store: Arc<dyn StatStore>,
    coins: CoinList,
    health: SharedHealthStats,
}

impl StatsCollector {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: Arc<dyn StatStore>,
        coins: CoinList,
        health: SharedHealthStats,
    ) -> Self {
        Self {
            source,
            store,
            coins,
            health,
        }
    }

    pub fn coins(&self) -> &CoinList {
        &self.coins
    }

    pub fn health(&self) -> &SharedHealthStats {
        &self.health
    }

    /// Fetch current market data for every configured coin and store it.
    ///
    /// Failures are logged and recorded in the health stats before being
    /// returned; the caller decides whether to surface them.
    #[instrument(skip(self), fields(coins = %self.coins.joined()))]
    pub async fn fetch_and_store(&self) -> Result<FetchSummary> {
        match self.run().await {
            Ok(summary) => {
                info!(
                    stored = summary.stored,
                    skipped = summary.skipped.len(),
                    "Stats stored: {}",
                    summary.coins.join(", ")
                );
                self.health.write().await.record_success(summary.stored);
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Fetch/store failed");
                self.health.write().await.record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<FetchSummary> {
        let markets = self.source.fetch_markets(&self.coins).await?;
        let fetched_at = Utc::now();
        let (observations, skipped) = build_observations(&markets, fetched_at);

        if observations.is_empty() {
            warn!("Price source returned no usable market entries, nothing stored");
        } else {
            self.store.insert_many(&observations).await?;
        }

        Ok(FetchSummary {
            stored: observations.len(),
            coins: observations.into_iter().map(|o| o.coin_id).collect(),
            skipped,
            fetched_at,
        })
    }
}

/// Map market entries to observations sharing one fetch time.
///
/// Entries missing price, market cap or 24h change are skipped; their ids are
/// returned alongside the observations.
pub fn build_observations(
    markets: &[CoinMarket],
    fetched_at: DateTime<Utc>,
) -> (Vec<Observation>, Vec<String>) {
    let mut observations = Vec::with_capacity(markets.len());
    let mut skipped = Vec::new();

    for market in markets {
        match (
            market.current_price,
            market.market_cap,
            market.price_change_percentage_24h,
        ) {
            (Some(price), Some(market_cap), Some(change)) => {
                observations.push(Observation::new(
                    market.id.clone(),
                    price,
                    market_cap,
                    change,
                    fetched_at,
                ));
            }
            _ => {
                warn!(
                    coin = %market.id,
                    price = ?market.current_price,
                    market_cap = ?market.market_cap,
                    change_24h = ?market.price_change_percentage_24h,
                    "Skipping incomplete market entry"
                );
                skipped.push(market.id.clone());
            }
        }
    }

    (observations, skipped)
}
