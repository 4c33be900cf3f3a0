use crate::error::{AppError, Result};
use crate::models::{timestamp_from_millis, Observation};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Persistence for observations
///
/// Observations are append-only: there is no update or delete path.
#[async_trait]
pub trait StatStore: Send + Sync {
    /// Insert a batch of observations atomically, returning rows written
    async fn insert_many(&self, observations: &[Observation]) -> Result<u64>;

    /// Up to `limit` observations for `coin_id`, newest first.
    /// Equal fetch times are ordered by insertion, newest first.
    async fn recent(&self, coin_id: &str, limit: usize) -> Result<Vec<Observation>>;

    /// Most recent observation for `coin_id`
    async fn latest(&self, coin_id: &str) -> Result<Option<Observation>> {
        Ok(self.recent(coin_id, 1).await?.into_iter().next())
    }

    /// Total number of stored observations
    async fn count(&self) -> Result<u64>;
}

/// SQLite-backed observation store
#[derive(Debug, Clone)]
pub struct SqliteStatStore {
    pool: SqlitePool,
}

impl SqliteStatStore {
    /// Connect to `database_url` (e.g. "sqlite://crypto_stats.db" or
    /// "sqlite::memory:") and create the schema if needed.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to stat store at: {}", database_url);

        let in_memory = database_url.contains(":memory:");

        let mut connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Config(format!("Invalid DATABASE_URL '{}': {}", database_url, e)))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));

        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so pin the pool to one
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(connect_options).await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        info!("Stat store ready");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crypto_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                coin_id TEXT NOT NULL,
                price_usd REAL NOT NULL,
                market_cap_usd REAL NOT NULL,
                change_24h_pct REAL NOT NULL,
                fetched_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_crypto_stats_coin_time ON crypto_stats(coin_id, fetched_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn observation_from_row(row: &SqliteRow) -> Result<Observation> {
    let millis: i64 = row.try_get("fetched_at")?;
    let fetched_at = timestamp_from_millis(millis)
        .ok_or_else(|| AppError::Database(format!("Invalid fetched_at value: {}", millis)))?;

    Ok(Observation {
        coin_id: row.try_get("coin_id")?,
        price_usd: row.try_get("price_usd")?,
        market_cap_usd: row.try_get("market_cap_usd")?,
        change_24h_pct: row.try_get("change_24h_pct")?,
        fetched_at,
    })
}

#[async_trait]
impl StatStore for SqliteStatStore {
    async fn insert_many(&self, observations: &[Observation]) -> Result<u64> {
        if observations.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for obs in observations {
            let result = sqlx::query(
                r#"
                INSERT INTO crypto_stats (coin_id, price_usd, market_cap_usd, change_24h_pct, fetched_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&obs.coin_id)
            .bind(obs.price_usd)
            .bind(obs.market_cap_usd)
            .bind(obs.change_24h_pct)
            .bind(obs.fetched_at_millis())
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        debug!("Inserted {} observations", inserted);
        Ok(inserted)
    }

    async fn recent(&self, coin_id: &str, limit: usize) -> Result<Vec<Observation>> {
        let rows = sqlx::query(
            r#"
            SELECT coin_id, price_usd, market_cap_usd, change_24h_pct, fetched_at
            FROM crypto_stats
            WHERE coin_id = ?
            ORDER BY fetched_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(coin_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(observation_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM crypto_stats")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    async fn memory_store() -> SqliteStatStore {
        SqliteStatStore::connect("sqlite::memory:").await.unwrap()
    }

    fn obs(coin: &str, price: f64, minutes: i64) -> Observation {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Observation::new(coin, price, price * 1000.0, 1.5, base + ChronoDuration::minutes(minutes))
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = memory_store().await;

        let inserted = store
            .insert_many(&[obs("bitcoin", 100.0, 0), obs("ethereum", 10.0, 0)])
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        store.close().await;
    }

    #[tokio::test]
    async fn test_insert_empty_batch_is_noop() {
        let store = memory_store().await;
        assert_eq!(store.insert_many(&[]).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_filtered_by_coin() {
        let store = memory_store().await;
        store
            .insert_many(&[
                obs("bitcoin", 100.0, 0),
                obs("bitcoin", 300.0, 20),
                obs("ethereum", 5.0, 30),
                obs("bitcoin", 200.0, 10),
            ])
            .await
            .unwrap();

        let recent = store.recent("bitcoin", 10).await.unwrap();
        let prices: Vec<f64> = recent.iter().map(|o| o.price_usd).collect();
        assert_eq!(prices, vec![300.0, 200.0, 100.0]);
        assert!(recent.iter().all(|o| o.coin_id == "bitcoin"));
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let store = memory_store().await;
        let batch: Vec<Observation> = (0..5).map(|i| obs("bitcoin", i as f64, i)).collect();
        store.insert_many(&batch).await.unwrap();

        let recent = store.recent("bitcoin", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].price_usd, 4.0);
        assert_eq!(recent[1].price_usd, 3.0);
    }

    #[tokio::test]
    async fn test_latest_breaks_ties_by_insertion_order() {
        let store = memory_store().await;
        store.insert_many(&[obs("bitcoin", 1.0, 5)]).await.unwrap();
        store.insert_many(&[obs("bitcoin", 2.0, 5)]).await.unwrap();

        let latest = store.latest("bitcoin").await.unwrap().unwrap();
        assert_eq!(latest.price_usd, 2.0);
    }

    #[tokio::test]
    async fn test_latest_for_unknown_coin_is_none() {
        let store = memory_store().await;
        assert!(store.latest("dogecoin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_fields() {
        let store = memory_store().await;
        let original = obs("matic-network", 0.75, 42);
        store.insert_many(std::slice::from_ref(&original)).await.unwrap();

        let loaded = store.latest("matic-network").await.unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_closed_pool_returns_database_error() {
        let store = memory_store().await;
        store.close().await;

        let result = store.insert_many(&[obs("bitcoin", 1.0, 0)]).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
