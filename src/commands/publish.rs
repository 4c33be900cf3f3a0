use crate::config::AppConfig;
use crate::services::{publish_trigger, TriggerMessage};

pub async fn run(trigger: String) {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let Some(redis_url) = config.redis_url else {
        eprintln!("❌ REDIS_URL is not set");
        std::process::exit(1);
    };

    let message = TriggerMessage { trigger };

    match publish_trigger(&redis_url, &config.channel, &message).await {
        Ok(receivers) => {
            println!(
                "✅ Published '{}' to {} ({} subscriber(s))",
                message.trigger, config.channel, receivers
            );
        }
        Err(e) => {
            eprintln!("❌ Publish failed: {}", e);
            std::process::exit(1);
        }
    }
}
