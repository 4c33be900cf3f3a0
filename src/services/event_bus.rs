//! Trigger messages on the Redis pub/sub channel
//!
//! Messages are JSON objects with a `trigger` string, e.g.
//! `{"trigger":"update"}`. Only the `update` trigger does anything; every
//! other payload is logged and dropped.

use crate::error::{AppError, Result};
use crate::services::collector::StatsCollector;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Trigger value that runs fetch-and-store
pub const UPDATE_TRIGGER: &str = "update";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMessage {
    pub trigger: String,
}

impl TriggerMessage {
    pub fn update() -> Self {
        Self {
            trigger: UPDATE_TRIGGER.to_string(),
        }
    }

    pub fn is_update(&self) -> bool {
        self.trigger == UPDATE_TRIGGER
    }
}

/// Parse a raw channel payload
pub fn parse_trigger(payload: &str) -> Result<TriggerMessage> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::Parse(format!("Invalid trigger message '{}': {}", payload, e)))
}

/// Handle one channel payload, returning whether fetch-and-store ran.
///
/// Never fails: parse errors and fetch errors are logged only.
pub async fn handle_message(collector: &StatsCollector, payload: &str) -> bool {
    let message = match parse_trigger(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed trigger message");
            return false;
        }
    };

    if !message.is_update() {
        debug!(trigger = %message.trigger, "Ignoring unrecognized trigger");
        return false;
    }

    info!("Received update event, storing stats...");
    collector.health().write().await.event_trigger_count += 1;

    // Already logged and recorded by the collector
    let _ = collector.fetch_and_store().await;
    true
}

/// Publish a trigger message, returning the number of subscribers reached
pub async fn publish_trigger(redis_url: &str, channel: &str, message: &TriggerMessage) -> Result<u32> {
    let client = redis::Client::open(redis_url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;

    let payload = serde_json::to_string(message)?;
    let receivers: u32 = conn.publish(channel, &payload).await?;

    info!(channel, receivers, "Published trigger message: {}", payload);
    Ok(receivers)
}
