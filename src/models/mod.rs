mod coin_list;
mod observation;

pub use coin_list::{CoinList, DEFAULT_COINS};
pub use observation::{timestamp_from_millis, Observation};
