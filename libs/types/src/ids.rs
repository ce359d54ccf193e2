//! Market identifier types
//!
//! A `MarketKey` is the exchange-assigned identifier of one trading pair,
//! treated as an opaque string — exchanges disagree on format ("BTCUSDT",
//! "XBT/USD", "tBTCUSD"), so no structure is assumed. The human-facing
//! representation is an `AssetPair` resolved through the symbol mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque exchange-assigned identifier for one trading pair.
///
/// Stable for the process lifetime; used to key the order book cache
/// and the last-published markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketKey(String);

impl MarketKey {
    /// Create a new MarketKey from a string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MarketKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A resolved base/quote asset pair.
///
/// Built from a "BASE/QUOTE" symbol; the wire representation keeps the
/// two assets as separate fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    /// Base asset (e.g. "BTC")
    pub base: String,
    /// Quote asset (e.g. "USDT")
    pub quote: String,
}

impl AssetPair {
    /// Create a new AssetPair from base and quote assets
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Parse a "BASE/QUOTE" symbol, returning None if the separator is missing
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let (base, quote) = symbol.split_once('/')?;
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        Some(Self::new(base, quote))
    }

    /// The "BASE/QUOTE" symbol form
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// The concatenated asset form with no separator ("BTCUSDT")
    pub fn concatenated(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
