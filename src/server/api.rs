use crate::server::{AppState, SharedStatStore};
use crate::services::{price_deviation, HealthStats, SharedHealthStats, StatsCollector};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Query parameters for /stats and /deviation
#[derive(Debug, Deserialize)]
pub struct CoinQuery {
    pub coin: Option<String>,
}

impl CoinQuery {
    /// Coin id, or a 400 response when absent or blank
    fn required_coin(&self) -> Result<&str, Response> {
        match self.coin.as_deref().map(str::trim) {
            Some(coin) if !coin.is_empty() => Ok(coin),
            _ => Err(error_response(StatusCode::BAD_REQUEST, "Missing coin parameter".to_string())),
        }
    }
}

/// Latest observation as returned by /stats
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub price: f64,
    #[serde(rename = "marketCap")]
    pub market_cap: f64,
    #[serde(rename = "24hChange")]
    pub change_24h: f64,
}

#[derive(Debug, Serialize)]
pub struct DeviationResponse {
    pub deviation: f64,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// GET /store-crypto-stats - Run fetch-and-store now
///
/// Always acknowledges with 200; failures are logged and visible through
/// /health (`last_fetch_ok`, `last_fetch_error`).
#[instrument(skip(collector))]
pub async fn store_crypto_stats_handler(State(collector): State<Arc<StatsCollector>>) -> impl IntoResponse {
    if let Err(e) = collector.fetch_and_store().await {
        warn!(error = %e, "Manual fetch failed, acknowledging anyway");
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Stats fetched and stored." })),
    )
        .into_response()
}

/// GET /stats?coin=bitcoin - Latest price, market cap and 24h change
#[instrument(skip(store))]
pub async fn stats_handler(
    State(store): State<SharedStatStore>,
    Query(params): Query<CoinQuery>,
) -> Response {
    let coin = match params.required_coin() {
        Ok(coin) => coin,
        Err(response) => return response,
    };

    match store.latest(coin).await {
        Ok(Some(stat)) => {
            debug!(coin, fetched_at = %stat.fetched_at, "Returning latest stats");
            (
                StatusCode::OK,
                Json(StatsResponse {
                    price: stat.price_usd,
                    market_cap: stat.market_cap_usd,
                    change_24h: stat.change_24h_pct,
                }),
            )
                .into_response()
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("No data for {}", coin)),
        Err(e) => {
            error!(coin, error = %e, "Failed to load latest stats");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load stats".to_string())
        }
    }
}

/// GET /deviation?coin=bitcoin - Population standard deviation of the
/// most recent prices (window configured by DEVIATION_WINDOW, default 100)
#[instrument(skip(app_state))]
pub async fn deviation_handler(
    State(app_state): State<AppState>,
    Query(params): Query<CoinQuery>,
) -> Response {
    let coin = match params.required_coin() {
        Ok(coin) => coin,
        Err(response) => return response,
    };

    let records = match app_state.store.recent(coin, app_state.deviation_window).await {
        Ok(records) => records,
        Err(e) => {
            error!(coin, error = %e, "Failed to load observations");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load observations".to_string(),
            );
        }
    };

    let prices: Vec<f64> = records.iter().map(|r| r.price_usd).collect();

    match price_deviation(&prices) {
        Some(deviation) => {
            debug!(coin, samples = prices.len(), deviation, "Returning deviation");
            (StatusCode::OK, Json(DeviationResponse { deviation })).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, format!("No records for {}", coin)),
    }
}

/// GET /health - Collector and store statistics
#[instrument(skip(health_state, app_state))]
pub async fn health_handler(
    State(health_state): State<SharedHealthStats>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    // Short timeout to avoid waiting behind a writer
    let health_snapshot = tokio::time::timeout(
        tokio::time::Duration::from_millis(100),
        health_state.read(),
    )
    .await;

    let mut health_stats = match health_snapshot {
        Ok(health) => health.clone(),
        Err(_) => {
            warn!("Health stats lock timeout, using defaults");
            HealthStats::default()
        }
    };

    health_stats.observation_count = match app_state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Failed to count observations");
            None
        }
    };
    health_stats.uptime_secs = app_state.started_at.elapsed().as_secs();
    health_stats.current_system_time = Utc::now().to_rfc3339();

    (StatusCode::OK, Json(health_stats)).into_response()
}
