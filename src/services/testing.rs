//! Test doubles shared by unit tests across modules

use crate::error::{AppError, Result};
use crate::models::{CoinList, Observation};
use crate::services::coingecko::{CoinMarket, PriceSource};
use crate::services::collector::StatsCollector;
use crate::services::health::{HealthStats, SharedHealthStats};
use crate::services::stat_store::{SqliteStatStore, StatStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub fn market(id: &str, price: f64) -> CoinMarket {
    CoinMarket {
        id: id.to_string(),
        current_price: Some(price),
        market_cap: Some(price * 1_000_000.0),
        price_change_percentage_24h: Some(1.0),
    }
}

/// Returns the same markets on every call and counts calls
pub struct StaticPriceSource {
    markets: Vec<CoinMarket>,
    calls: AtomicUsize,
}

impl StaticPriceSource {
    pub fn new(markets: Vec<CoinMarket>) -> Self {
        Self {
            markets,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_markets(&self, _coins: &CoinList) -> Result<Vec<CoinMarket>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.markets.clone())
    }
}

pub struct FailingPriceSource;

#[async_trait]
impl PriceSource for FailingPriceSource {
    async fn fetch_markets(&self, _coins: &CoinList) -> Result<Vec<CoinMarket>> {
        Err(AppError::Network("connection refused".to_string()))
    }
}

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl StatStore for FailingStore {
    async fn insert_many(&self, _observations: &[Observation]) -> Result<u64> {
        Err(AppError::Database("disk I/O error".to_string()))
    }

    async fn recent(&self, _coin_id: &str, _limit: usize) -> Result<Vec<Observation>> {
        Err(AppError::Database("disk I/O error".to_string()))
    }

    async fn count(&self) -> Result<u64> {
        Err(AppError::Database("disk I/O error".to_string()))
    }
}

pub fn failing_store() -> Arc<dyn StatStore> {
    Arc::new(FailingStore)
}

pub async fn memory_store() -> Arc<SqliteStatStore> {
    Arc::new(SqliteStatStore::connect("sqlite::memory:").await.unwrap())
}

pub fn shared_health() -> SharedHealthStats {
    Arc::new(RwLock::new(HealthStats::default()))
}

pub fn collector_with(
    source: Arc<dyn PriceSource>,
    store: Arc<dyn StatStore>,
) -> (Arc<StatsCollector>, SharedHealthStats) {
    let health = shared_health();
    let collector = StatsCollector::new(source, store, CoinList::default(), health.clone());
    (Arc::new(collector), health)
}
