//! Configured coin list
//!
//! The set of CoinGecko ids fetched on every collector run. Loaded from the
//! `CRYPTO_COINS` environment variable (comma separated) with the historical
//! default of bitcoin, ethereum and matic-network.

use serde::{Deserialize, Serialize};

/// Coins fetched when nothing else is configured
pub const DEFAULT_COINS: &[&str] = &["bitcoin", "ethereum", "matic-network"];

/// Ordered, de-duplicated list of coin ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinList(Vec<String>);

impl CoinList {
    /// Build a coin list, trimming and lowercasing ids and dropping duplicates
    /// while preserving first-seen order.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut coins: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref().trim().to_lowercase();
            if !id.is_empty() && !coins.contains(&id) {
                coins.push(id);
            }
        }
        Self(coins)
    }

    /// Parse a comma-separated list (e.g. "bitcoin, ethereum")
    pub fn parse(s: &str) -> Result<Self, String> {
        let list = Self::new(s.split(','));
        if list.is_empty() {
            return Err(format!("Invalid coin list: '{}' contains no coin ids", s));
        }
        Ok(list)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined ids, as expected by the CoinGecko `ids` parameter
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl Default for CoinList {
    fn default() -> Self {
        Self::new(DEFAULT_COINS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coins() {
        let coins = CoinList::default();
        assert_eq!(coins.joined(), "bitcoin,ethereum,matic-network");
        assert_eq!(coins.len(), 3);
    }

    #[test]
    fn test_parse_normalizes_and_dedups() {
        let coins = CoinList::parse(" Bitcoin, ethereum,,bitcoin ,solana").unwrap();
        assert_eq!(coins.ids(), &["bitcoin", "ethereum", "solana"]);
    }

    #[test]
    fn test_parse_rejects_empty_list() {
        assert!(CoinList::parse("").is_err());
        assert!(CoinList::parse(" , ,").is_err());
    }
}
