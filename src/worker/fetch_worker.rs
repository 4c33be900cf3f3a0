use crate::services::StatsCollector;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument};

/// Run fetch-and-store every `interval`, forever.
///
/// The first run happens immediately. Failures are logged and the loop
/// keeps going.
#[instrument(skip(collector))]
pub async fn run(collector: Arc<StatsCollector>, interval: Duration) {
    info!(
        worker = "Fetch",
        interval_secs = interval.as_secs(),
        coins = %collector.coins().joined(),
        "Starting fetch worker"
    );

    let mut iteration_count = 0u64;

    loop {
        iteration_count += 1;
        run_iteration(&collector, iteration_count).await;
        sleep(interval).await;
    }
}

/// One worker iteration, returning whether fetch-and-store succeeded
pub async fn run_iteration(collector: &StatsCollector, iteration: u64) -> bool {
    let loop_start = std::time::Instant::now();

    match collector.fetch_and_store().await {
        Ok(summary) => {
            info!(
                worker = "Fetch",
                iteration,
                stored = summary.stored,
                duration_ms = loop_start.elapsed().as_millis() as u64,
                "Fetch cycle completed"
            );
            true
        }
        Err(e) => {
            error!(
                worker = "Fetch",
                iteration,
                error = %e,
                "Fetch cycle failed, will retry next interval"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        collector_with, failing_store, market, memory_store, FailingPriceSource, StaticPriceSource,
    };

    #[tokio::test]
    async fn test_iteration_reports_outcome() {
        let source = Arc::new(StaticPriceSource::new(vec![market("bitcoin", 1.0)]));
        let (ok_collector, _) = collector_with(source, memory_store().await);
        assert!(run_iteration(&ok_collector, 1).await);

        let (failing_collector, _) = collector_with(Arc::new(FailingPriceSource), memory_store().await);
        assert!(!run_iteration(&failing_collector, 1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_fetches_on_each_interval() {
        // Source calls happen before the store write, so a failing store is enough
        let source = Arc::new(StaticPriceSource::new(vec![market("bitcoin", 1.0)]));
        let (collector, _) = collector_with(source.clone(), failing_store());

        let handle = tokio::spawn(run(collector, Duration::from_secs(60)));

        // Immediate run plus two interval ticks
        tokio::time::sleep(Duration::from_secs(125)).await;
        handle.abort();

        assert_eq!(source.calls(), 3);
    }
}
