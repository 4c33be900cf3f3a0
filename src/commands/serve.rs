use crate::commands::build_context;
use crate::server::{self, AppState};
use crate::worker;
use tracing::{error, info, warn};

pub async fn run() {
    let ctx = match build_context().await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        port = ctx.config.port,
        coins = %ctx.config.coins.joined(),
        "Starting cryptostats server"
    );

    // Event subscriber (Redis pub/sub)
    match ctx.config.redis_url.as_deref() {
        Some(redis_url) => match redis::Client::open(redis_url) {
            Ok(client) => {
                info!(channel = %ctx.config.channel, "Spawning event subscriber");
                tokio::spawn(worker::run_event_worker(
                    client,
                    ctx.config.channel.clone(),
                    ctx.collector.clone(),
                ));
            }
            Err(e) => {
                error!(error = %e, "Invalid REDIS_URL, event subscriber disabled");
                ctx.health.write().await.event_subscriber_enabled = false;
            }
        },
        None => warn!("REDIS_URL not set, event subscriber disabled"),
    }

    // Periodic fetch worker
    if let Some(interval) = ctx.config.fetch_interval {
        info!(interval_secs = interval.as_secs(), "Spawning fetch worker");
        tokio::spawn(worker::run_fetch_worker(ctx.collector.clone(), interval));
    }

    let app_state = AppState::new(
        ctx.store.clone(),
        ctx.collector.clone(),
        ctx.health.clone(),
        ctx.config.deviation_window,
    );

    if let Err(e) = server::serve(app_state, ctx.config.port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }

    ctx.store.close().await;
}
