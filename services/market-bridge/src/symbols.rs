//! Reverse symbol mapping
//!
//! Maps an exchange-assigned market key back to the human-facing
//! "BASE/QUOTE" symbol. Mappings come from configuration; a key with no
//! explicit mapping resolves anyway when the key itself already carries
//! the separator (several venues use "BASE/QUOTE" as the market id).

use std::collections::BTreeMap;

use types::ids::{AssetPair, MarketKey};

/// Market key → "BASE/QUOTE" lookup.
#[derive(Debug, Clone, Default)]
pub struct SymbolMapper {
    reverse: BTreeMap<MarketKey, String>,
}

impl SymbolMapper {
    pub fn new() -> Self {
        Self {
            reverse: BTreeMap::new(),
        }
    }

    /// Build from (market key, symbol) pairs, e.g. from configuration.
    pub fn from_pairs<I, K, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<String>,
    {
        let reverse = pairs
            .into_iter()
            .map(|(key, symbol)| (MarketKey::new(key), symbol.into()))
            .collect();
        Self { reverse }
    }

    /// Register one mapping.
    pub fn insert(&mut self, key: MarketKey, symbol: impl Into<String>) {
        self.reverse.insert(key, symbol.into());
    }

    /// The mapped "BASE/QUOTE" symbol for a market key, if any.
    pub fn reverse(&self, key: &MarketKey) -> Option<&str> {
        self.reverse.get(key).map(String::as_str)
    }

    /// Resolve a market key to an asset pair.
    ///
    /// Uses the explicit mapping first, then falls back to parsing the key
    /// itself. None means the market cannot be represented on the wire.
    pub fn resolve(&self, key: &MarketKey) -> Option<AssetPair> {
        match self.reverse(key) {
            Some(symbol) => AssetPair::from_symbol(symbol),
            None => AssetPair::from_symbol(key.as_str()),
        }
    }

    /// Number of configured mappings.
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
