use crate::commands::build_context;

pub async fn run() {
    let ctx = match build_context().await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("📡 Fetching stats for: {}", ctx.config.coins.joined());

    let result = ctx.collector.fetch_and_store().await;
    ctx.store.close().await;

    match result {
        Ok(summary) => {
            println!("✅ Stored {} observations: {}", summary.stored, summary.coins.join(", "));
            if !summary.skipped.is_empty() {
                println!("⚠️  Skipped incomplete entries: {}", summary.skipped.join(", "));
            }
        }
        Err(e) => {
            eprintln!("❌ Fetch failed: {}", e);
            std::process::exit(1);
        }
    }
}
