use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Runtime statistics reported by `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStats {
    // Collector statistics
    pub fetch_count: u64,
    pub fetch_failures: u64,
    pub event_trigger_count: u64,
    pub last_fetch_at: Option<String>,
    pub last_fetch_ok: Option<bool>,
    pub last_fetch_error: Option<String>,
    pub last_stored_count: usize,

    // Configuration snapshot
    pub coins: Vec<String>,
    pub event_subscriber_enabled: bool,
    pub fetch_worker_enabled: bool,

    // Store statistics (filled per request)
    pub observation_count: Option<u64>,

    // System info
    pub uptime_secs: u64,
    pub current_system_time: String,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            fetch_count: 0,
            fetch_failures: 0,
            event_trigger_count: 0,
            last_fetch_at: None,
            last_fetch_ok: None,
            last_fetch_error: None,
            last_stored_count: 0,
            coins: Vec::new(),
            event_subscriber_enabled: false,
            fetch_worker_enabled: false,
            observation_count: None,
            uptime_secs: 0,
            current_system_time: Utc::now().to_rfc3339(),
        }
    }
}

impl HealthStats {
    pub fn record_success(&mut self, stored: usize) {
        self.fetch_count += 1;
        self.last_fetch_at = Some(Utc::now().to_rfc3339());
        self.last_fetch_ok = Some(true);
        self.last_fetch_error = None;
        self.last_stored_count = stored;
    }

    pub fn record_failure(&mut self, error: &str) {
        self.fetch_count += 1;
        self.fetch_failures += 1;
        self.last_fetch_at = Some(Utc::now().to_rfc3339());
        self.last_fetch_ok = Some(false);
        self.last_fetch_error = Some(error.to_string());
        self.last_stored_count = 0;
    }
}

/// Shared health statistics
pub type SharedHealthStats = Arc<RwLock<HealthStats>>;
