use crate::commands::build_context;
use crate::services::{price_deviation, StatStore};

pub async fn run() {
    let ctx = match build_context().await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("📊 cryptostats status");
    println!("   💾 Store: {}", ctx.config.database_url);

    match ctx.store.count().await {
        Ok(count) => println!("   📈 Observations: {}", count),
        Err(e) => eprintln!("   ⚠️  Failed to count observations: {}", e),
    }
    println!();

    for coin in ctx.config.coins.ids() {
        let records = match ctx.store.recent(coin, ctx.config.deviation_window).await {
            Ok(records) => records,
            Err(e) => {
                eprintln!("   ❌ {}: {}", coin, e);
                continue;
            }
        };

        let Some(latest) = records.first() else {
            println!("   {:<16} no data", coin);
            continue;
        };

        let prices: Vec<f64> = records.iter().map(|r| r.price_usd).collect();
        let deviation = price_deviation(&prices).unwrap_or_default();

        println!(
            "   {:<16} price=${:<14.4} cap=${:<18.0} 24h={:>+7.2}%  σ({})={:.2}  at {}",
            coin,
            latest.price_usd,
            latest.market_cap_usd,
            latest.change_24h_pct,
            prices.len(),
            deviation,
            latest.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }

    ctx.store.close().await;
}
