use crate::error::Result;
use crate::services::{handle_message, StatsCollector};
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Delay before resubscribing after the bus connection is lost
const RECONNECT_DELAY_SECS: u64 = 5;

/// Subscribe to `channel` and run fetch-and-store on every update trigger.
///
/// Runs forever; a dropped connection is logged and the subscription is
/// re-established after a fixed delay.
#[instrument(skip(client, collector))]
pub async fn run(client: redis::Client, channel: String, collector: Arc<StatsCollector>) {
    let mut session = 0u64;

    loop {
        session += 1;

        match subscribe_and_consume(&client, &channel, &collector).await {
            Ok(triggered) => {
                warn!(
                    worker = "Event",
                    session,
                    triggered,
                    "Subscription stream ended, reconnecting in {}s",
                    RECONNECT_DELAY_SECS
                );
            }
            Err(e) => {
                error!(
                    worker = "Event",
                    session,
                    error = %e,
                    "Subscriber connection failed, retrying in {}s",
                    RECONNECT_DELAY_SECS
                );
            }
        }

        sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
    }
}

async fn subscribe_and_consume(
    client: &redis::Client,
    channel: &str,
    collector: &StatsCollector,
) -> Result<u64> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!(worker = "Event", channel, "Redis subscriber connected");

    let payloads = pubsub.on_message().filter_map(|msg| async move {
        match msg.get_payload::<String>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(error = %e, "Dropping message with non-text payload");
                None
            }
        }
    });

    Ok(consume(payloads, collector).await)
}

/// Feed every payload to the trigger handler until the stream ends,
/// returning how many payloads ran fetch-and-store.
///
/// Payloads are handled concurrently, so a slow fetch does not hold up
/// triggers that arrive while it is running.
pub async fn consume<S>(payloads: S, collector: &StatsCollector) -> u64
where
    S: Stream<Item = String>,
{
    let triggered = AtomicU64::new(0);

    payloads
        .for_each_concurrent(None, |payload| {
            let triggered = &triggered;
            async move {
                if handle_message(collector, &payload).await {
                    triggered.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
        .await;

    triggered.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as AppResult;
    use crate::models::CoinList;
    use crate::services::testing::{collector_with, market, memory_store, StaticPriceSource};
    use crate::services::{CoinMarket, PriceSource};
    use async_trait::async_trait;
    use futures::stream;
    use tokio::sync::Barrier;

    /// Every fetch waits until the barrier's full party is fetching at once
    struct GatedPriceSource {
        gate: Barrier,
    }

    #[async_trait]
    impl PriceSource for GatedPriceSource {
        async fn fetch_markets(&self, _coins: &CoinList) -> AppResult<Vec<CoinMarket>> {
            self.gate.wait().await;
            Ok(vec![market("bitcoin", 1.0)])
        }
    }

    #[tokio::test]
    async fn test_consume_counts_only_update_triggers() {
        let source = Arc::new(StaticPriceSource::new(vec![market("bitcoin", 1.0)]));
        let (collector, _) = collector_with(source.clone(), memory_store().await);

        let payloads = stream::iter(vec![
            r#"{"trigger":"update"}"#.to_string(),
            "garbage".to_string(),
            r#"{"trigger":"noop"}"#.to_string(),
            r#"{"trigger":"update"}"#.to_string(),
        ]);

        let triggered = consume(payloads, &collector).await;

        assert_eq!(triggered, 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_consume_runs_triggers_concurrently() {
        let source = Arc::new(GatedPriceSource { gate: Barrier::new(2) });
        let (collector, _) = collector_with(source, memory_store().await);

        let payloads = stream::iter(vec![
            r#"{"trigger":"update"}"#.to_string(),
            r#"{"trigger":"update"}"#.to_string(),
        ]);

        // One-at-a-time handling would never release the gate
        let triggered = tokio::time::timeout(Duration::from_secs(5), consume(payloads, &collector))
            .await
            .expect("triggers should run concurrently");

        assert_eq!(triggered, 2);
    }

    #[tokio::test]
    async fn test_consume_survives_only_malformed_messages() {
        let source = Arc::new(StaticPriceSource::new(vec![market("bitcoin", 1.0)]));
        let (collector, _) = collector_with(source.clone(), memory_store().await);

        let payloads = stream::iter(vec!["{".to_string(), "[]".to_string(), "null".to_string()]);

        assert_eq!(consume(payloads, &collector).await, 0);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    #[ignore] // Requires a running Redis at REDIS_URL
    async fn test_subscriber_receives_published_trigger() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let source = Arc::new(StaticPriceSource::new(vec![market("bitcoin", 1.0)]));
        let (collector, _) = collector_with(source.clone(), memory_store().await);

        let client = redis::Client::open(redis_url.as_str()).unwrap();
        let handle = tokio::spawn(run(client, "crypto_update_test".to_string(), collector));
        sleep(Duration::from_millis(500)).await;

        crate::services::publish_trigger(
            &redis_url,
            "crypto_update_test",
            &crate::services::TriggerMessage::update(),
        )
        .await
        .unwrap();

        sleep(Duration::from_millis(500)).await;
        handle.abort();
        assert_eq!(source.calls(), 1);
    }
}
