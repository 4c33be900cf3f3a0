pub mod api;

use crate::services::{SharedHealthStats, StatStore, StatsCollector};
use axum::{extract::FromRef, http::Method, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

/// Shared handle to the observation store
pub type SharedStatStore = Arc<dyn StatStore>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStatStore,
    pub collector: Arc<StatsCollector>,
    pub health_stats: SharedHealthStats,
    /// Observations used per deviation query
    pub deviation_window: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        store: SharedStatStore,
        collector: Arc<StatsCollector>,
        health_stats: SharedHealthStats,
        deviation_window: usize,
    ) -> Self {
        Self {
            store,
            collector,
            health_stats,
            deviation_window,
            started_at: Instant::now(),
        }
    }
}

// FromRef implementations to extract specific state components
impl FromRef<AppState> for SharedStatStore {
    fn from_ref(app_state: &AppState) -> SharedStatStore {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<StatsCollector> {
    fn from_ref(app_state: &AppState) -> Arc<StatsCollector> {
        app_state.collector.clone()
    }
}

impl FromRef<AppState> for SharedHealthStats {
    fn from_ref(app_state: &AppState) -> SharedHealthStats {
        app_state.health_stats.clone()
    }
}

/// Build the router with all routes and layers
pub fn router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/store-crypto-stats", get(api::store_crypto_stats_handler))
        .route("/stats", get(api::stats_handler))
        .route("/deviation", get(api::deviation_handler))
        .route("/health", get(api::health_handler))
        .layer(cors)
        .with_state(app_state)
}

/// Start the axum server, returning when Ctrl-C is received
pub async fn serve(app_state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Registering routes:");
    tracing::info!("  GET /store-crypto-stats");
    tracing::info!("  GET /stats?coin=bitcoin");
    tracing::info!("  GET /deviation?coin=bitcoin");
    tracing::info!("  GET /health");

    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "cryptostats listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
