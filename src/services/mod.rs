pub mod coingecko;
pub mod collector;
pub mod deviation;
pub mod event_bus;
pub mod health;
pub mod stat_store;

#[cfg(test)]
pub(crate) mod testing;

pub use coingecko::{CoinGeckoClient, CoinMarket, PriceSource};
pub use collector::{build_observations, FetchSummary, StatsCollector};
pub use deviation::{population_std_dev, price_deviation, round_to};
pub use event_bus::{handle_message, parse_trigger, publish_trigger, TriggerMessage, UPDATE_TRIGGER};
pub use health::{HealthStats, SharedHealthStats};
pub use stat_store::{SqliteStatStore, StatStore};
