pub mod fetch;
pub mod publish;
pub mod serve;
pub mod status;

use crate::config::AppConfig;
use crate::error::Result;
use crate::services::{CoinGeckoClient, HealthStats, SharedHealthStats, SqliteStatStore, StatsCollector};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-scoped resources, built once per command
pub struct Context {
    pub config: AppConfig,
    pub store: Arc<SqliteStatStore>,
    pub collector: Arc<StatsCollector>,
    pub health: SharedHealthStats,
}

/// Load configuration and connect the store and price source
pub async fn build_context() -> Result<Context> {
    let config = AppConfig::from_env()?;

    let store = Arc::new(SqliteStatStore::connect(&config.database_url).await?);
    let source = Arc::new(CoinGeckoClient::new(
        &config.coingecko_base_url,
        config.request_timeout,
    )?);

    let health = Arc::new(RwLock::new(HealthStats {
        coins: config.coins.ids().to_vec(),
        event_subscriber_enabled: config.redis_url.is_some(),
        fetch_worker_enabled: config.fetch_interval.is_some(),
        ..HealthStats::default()
    }));

    let collector = Arc::new(StatsCollector::new(
        source,
        store.clone(),
        config.coins.clone(),
        health.clone(),
    ));

    Ok(Context {
        config,
        store,
        collector,
        health,
    })
}
