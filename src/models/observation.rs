use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One persisted snapshot of a coin's market data
///
/// Observations are written in batches by the collector and never updated
/// afterwards. All numeric fields are USD-denominated except
/// `change_24h_pct`, which is a percentage (e.g. `-2.35` for -2.35%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// CoinGecko coin id (e.g. "bitcoin", "matic-network")
    pub coin_id: String,

    /// Spot price in USD
    pub price_usd: f64,

    /// Market capitalisation in USD
    pub market_cap_usd: f64,

    /// Price change over the last 24 hours, in percent
    #[serde(rename = "change24hPct")]
    pub change_24h_pct: f64,

    /// When the observation was fetched
    pub fetched_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        coin_id: impl Into<String>,
        price_usd: f64,
        market_cap_usd: f64,
        change_24h_pct: f64,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            coin_id: coin_id.into(),
            price_usd,
            market_cap_usd,
            change_24h_pct,
            fetched_at,
        }
    }

    /// Fetch time as unix milliseconds (storage representation)
    pub fn fetched_at_millis(&self) -> i64 {
        self.fetched_at.timestamp_millis()
    }
}

/// Convert stored unix milliseconds back into a UTC timestamp
pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
