//! In-memory per-market order book cache
//!
//! Maintains one `InternalOrderBook` per market key. Uses `BTreeMap` keyed
//! by `Decimal` price so best-bid (maximum key) and best-ask (minimum key)
//! are ordered reads, and all arithmetic stays in `Decimal`.
//!
//! The cache processes:
//! - snapshot events → wholesale replacement of the book
//! - update events → per-level patch: remove the price key, re-insert only
//!   if the new size is non-zero
//!
//! Invariant: a level with size 0 is never present in either side — size 0
//! signals removal, not a zero-quantity order. An update that empties one
//! side leaves that side's best price as `None`, never a stale value.
//!
//! The cache is purely in-memory; after a restart it is rebuilt from the
//! next snapshot event per market.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::warn;
use types::ids::MarketKey;
use types::numeric::parse_decimal;

use crate::events::{BookEvent, RawLevel};

/// Errors from cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// An update arrived for a market with no cached book. Indicates a
    /// missed snapshot; recoverable only by waiting for the next one.
    #[error("order book {0} not found in cache during update")]
    MissingBook(MarketKey),
}

/// One market's mutable bid/ask ladders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalOrderBook {
    /// Exchange name, raw as received from the feed.
    pub source: String,
    /// Exchange-assigned market identifier.
    pub market_key: MarketKey,
    /// price → size; best bid = maximum key.
    bids: BTreeMap<Decimal, Decimal>,
    /// price → size; best ask = minimum key.
    asks: BTreeMap<Decimal, Decimal>,
    /// Upstream event time in Unix milliseconds; absent on most exchanges.
    pub timestamp_ms: Option<i64>,
    /// Event time when the feed provides one, else UTC at last mutation.
    pub timestamp: DateTime<Utc>,
}

impl InternalOrderBook {
    /// Build a book from a snapshot (or from a bare update, for delta-only
    /// publishing). Unparseable and zero-size levels are never inserted.
    pub fn from_event(event: &BookEvent, now: DateTime<Utc>) -> Self {
        let mut book = Self {
            source: event.exchange.clone(),
            market_key: event.market_key.clone(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            timestamp_ms: None,
            timestamp: now,
        };

        for level in &event.bids {
            if let Some((price, size)) = parse_level(level) {
                if !size.is_zero() {
                    book.bids.insert(price, size);
                }
            }
        }
        for level in &event.asks {
            if let Some((price, size)) = parse_level(level) {
                if !size.is_zero() {
                    book.asks.insert(price, size);
                }
            }
        }

        book.touch(event.timestamp_ms, now);
        book
    }

    /// Patch the book with an incremental update.
    ///
    /// Each changed level removes the existing price key first, then
    /// re-inserts with the new size only if it is non-zero. The two-step
    /// form keeps the no-zero-size invariant.
    pub fn apply_update(&mut self, event: &BookEvent, now: DateTime<Utc>) {
        for level in &event.asks {
            if let Some((price, size)) = parse_level(level) {
                self.asks.remove(&price);
                if !size.is_zero() {
                    self.asks.insert(price, size);
                }
            }
        }
        for level in &event.bids {
            if let Some((price, size)) = parse_level(level) {
                self.bids.remove(&price);
                if !size.is_zero() {
                    self.bids.insert(price, size);
                }
            }
        }

        self.touch(event.timestamp_ms, now);
    }

    /// Current best bid price (maximum bid key), None when the side is empty.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Current best ask price (minimum ask key), None when the side is empty.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Bid levels in descending price order (best first).
    pub fn bids_descending(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.bids.iter().rev().map(|(p, s)| (*p, *s))
    }

    /// Ask levels in ascending price order (best first).
    pub fn asks_ascending(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.asks.iter().map(|(p, s)| (*p, *s))
    }

    /// Number of bid price levels.
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask price levels.
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    /// Size resting at a bid price, if the level exists.
    pub fn bid_size(&self, price: &Decimal) -> Option<Decimal> {
        self.bids.get(price).copied()
    }

    /// Size resting at an ask price, if the level exists.
    pub fn ask_size(&self, price: &Decimal) -> Option<Decimal> {
        self.asks.get(price).copied()
    }

    /// Recompute the derived timestamps from an event time.
    fn touch(&mut self, timestamp_ms: Option<i64>, now: DateTime<Utc>) {
        self.timestamp_ms = timestamp_ms;
        self.timestamp = timestamp_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(now);
    }
}

/// Parse a raw level; unparseable levels are dropped with a warning.
fn parse_level(level: &RawLevel) -> Option<(Decimal, Decimal)> {
    match (parse_decimal(&level.price), parse_decimal(&level.size)) {
        (Some(price), Some(size)) => Some((price, size)),
        _ => {
            warn!(
                price = %level.price,
                size = %level.size,
                "Dropping unparseable level"
            );
            None
        }
    }
}

/// Keyed store of per-market books, owned by the event handler.
///
/// A book is created by the first snapshot for its key and lives until
/// process termination; deltas cannot create a book.
#[derive(Debug, Default)]
pub struct OrderBookCache {
    books: BTreeMap<MarketKey, InternalOrderBook>,
}

impl OrderBookCache {
    pub fn new() -> Self {
        Self {
            books: BTreeMap::new(),
        }
    }

    /// Replace any existing book for the event's market wholesale.
    /// Always succeeds and returns the new current book.
    pub fn apply_snapshot(&mut self, event: &BookEvent, now: DateTime<Utc>) -> &InternalOrderBook {
        let book = InternalOrderBook::from_event(event, now);
        match self.books.entry(event.market_key.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(book);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(book),
        }
    }

    /// Patch an existing book; fails without mutation when the key is absent.
    pub fn apply_update(
        &mut self,
        event: &BookEvent,
        now: DateTime<Utc>,
    ) -> Result<&InternalOrderBook, CacheError> {
        let book = self
            .books
            .get_mut(&event.market_key)
            .ok_or_else(|| CacheError::MissingBook(event.market_key.clone()))?;
        book.apply_update(event, now);
        Ok(book)
    }

    /// Best bid for a market, None when the market or side is absent.
    pub fn best_bid(&self, key: &MarketKey) -> Option<Decimal> {
        self.books.get(key).and_then(|b| b.best_bid())
    }

    /// Best ask for a market, None when the market or side is absent.
    pub fn best_ask(&self, key: &MarketKey) -> Option<Decimal> {
        self.books.get(key).and_then(|b| b.best_ask())
    }

    /// Get a market's current book.
    pub fn get(&self, key: &MarketKey) -> Option<&InternalOrderBook> {
        self.books.get(key)
    }

    /// All cached books in key order.
    pub fn iter(&self) -> impl Iterator<Item = &InternalOrderBook> {
        self.books.values()
    }

    /// Number of cached markets.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn snapshot_event(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> BookEvent {
        BookEvent {
            exchange: "binance".to_string(),
            market_key: MarketKey::new("BTCUSDT"),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            bids: bids.iter().map(|(p, s)| RawLevel::new(*p, *s)).collect(),
            asks: asks.iter().map(|(p, s)| RawLevel::new(*p, *s)).collect(),
            timestamp_ms: None,
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_snapshot_creates_book() {
        let mut cache = OrderBookCache::new();
        let event = snapshot_event(&[("50000", "1.0"), ("49900", "2.0")], &[("50100", "1.5")]);

        let book = cache.apply_snapshot(&event, Utc::now());
        assert_eq!(book.bid_depth(), 2);
        assert_eq!(book.ask_depth(), 1);
        assert_eq!(book.best_bid(), Some(dec("50000")));
        assert_eq!(book.best_ask(), Some(dec("50100")));
    }

    #[test]
    fn test_snapshot_replaces_wholesale() {
        let mut cache = OrderBookCache::new();
        cache.apply_snapshot(
            &snapshot_event(&[("50000", "1.0"), ("49900", "2.0")], &[]),
            Utc::now(),
        );

        let book = cache.apply_snapshot(&snapshot_event(&[("48000", "3.0")], &[]), Utc::now());
        assert_eq!(book.bid_depth(), 1);
        assert_eq!(book.best_bid(), Some(dec("48000")));
    }

    #[test]
    fn test_update_requires_existing_book() {
        let mut cache = OrderBookCache::new();
        let event = snapshot_event(&[("50000", "1.0")], &[]);

        let err = cache.apply_update(&event, Utc::now()).unwrap_err();
        assert_eq!(err, CacheError::MissingBook(MarketKey::new("BTCUSDT")));
        assert!(cache.get(&MarketKey::new("BTCUSDT")).is_none());
    }

    #[test]
    fn test_update_sets_and_removes_levels() {
        let mut cache = OrderBookCache::new();
        cache.apply_snapshot(
            &snapshot_event(&[("50000", "1.0"), ("49900", "2.0")], &[("50100", "1.5")]),
            Utc::now(),
        );

        // Change one level, remove another, add a new one
        let update = snapshot_event(
            &[("50000", "0.5"), ("49900", "0"), ("49800", "4.0")],
            &[("50100", "0")],
        );
        let book = cache.apply_update(&update, Utc::now()).unwrap();

        assert_eq!(book.bid_size(&dec("50000")), Some(dec("0.5")));
        assert_eq!(book.bid_size(&dec("49900")), None);
        assert_eq!(book.bid_size(&dec("49800")), Some(dec("4.0")));
        assert_eq!(book.ask_depth(), 0);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_no_zero_size_levels_after_any_sequence() {
        let mut cache = OrderBookCache::new();
        cache.apply_snapshot(
            &snapshot_event(&[("50000", "1.0"), ("49900", "0")], &[("50100", "0")]),
            Utc::now(),
        );
        let update = snapshot_event(&[("50000", "0"), ("49800", "2.0")], &[("50200", "0")]);
        let book = cache.apply_update(&update, Utc::now()).unwrap();

        assert!(book.bids_descending().all(|(_, size)| !size.is_zero()));
        assert!(book.asks_ascending().all(|(_, size)| !size.is_zero()));
        assert_eq!(book.bid_depth(), 1);
        assert_eq!(book.ask_depth(), 0);
    }

    #[test]
    fn test_emptied_side_reports_none() {
        let mut cache = OrderBookCache::new();
        cache.apply_snapshot(&snapshot_event(&[("50000", "1.0")], &[("50100", "1.0")]), Utc::now());

        let update = snapshot_event(&[("50000", "0")], &[]);
        cache.apply_update(&update, Utc::now()).unwrap();

        let key = MarketKey::new("BTCUSDT");
        assert_eq!(cache.best_bid(&key), None);
        assert_eq!(cache.best_ask(&key), Some(dec("50100")));
    }

    #[test]
    fn test_unparseable_levels_dropped() {
        let mut cache = OrderBookCache::new();
        let book = cache.apply_snapshot(
            &snapshot_event(&[("garbage", "1.0"), ("50000", "1.0")], &[("50100", "junk")]),
            Utc::now(),
        );
        assert_eq!(book.bid_depth(), 1);
        assert_eq!(book.ask_depth(), 0);
    }

    #[test]
    fn test_update_timestamp_fallback() {
        let mut cache = OrderBookCache::new();
        cache.apply_snapshot(&snapshot_event(&[("50000", "1.0")], &[]), Utc::now());

        // Update with an upstream timestamp
        let mut update = snapshot_event(&[("50000", "2.0")], &[]);
        update.timestamp_ms = Some(1708123456789);
        let book = cache.apply_update(&update, Utc::now()).unwrap();
        assert_eq!(book.timestamp_ms, Some(1708123456789));
        assert_eq!(book.timestamp.timestamp_millis(), 1708123456789);

        // Update without one falls back to now
        let now = Utc::now();
        let update = snapshot_event(&[("50000", "3.0")], &[]);
        let book = cache.apply_update(&update, now).unwrap();
        assert_eq!(book.timestamp_ms, None);
        assert_eq!(book.timestamp, now);
    }

    proptest! {
        /// best_bid is always the maximum bid key, best_ask the minimum
        /// ask key, for any ladder the feed can produce.
        #[test]
        fn prop_best_prices(levels in proptest::collection::vec((1u32..1_000_000, 0u32..1_000), 1..40)) {
            let bids: Vec<(String, String)> = levels
                .iter()
                .map(|(p, s)| (p.to_string(), s.to_string()))
                .collect();
            let event = snapshot_event(
                &bids.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect::<Vec<_>>(),
                &bids.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect::<Vec<_>>(),
            );
            let mut cache = OrderBookCache::new();
            let book = cache.apply_snapshot(&event, Utc::now());

            let nonzero: Vec<Decimal> = levels
                .iter()
                .filter(|(_, s)| *s != 0)
                .map(|(p, _)| Decimal::from(*p))
                .collect();

            prop_assert_eq!(book.best_bid(), nonzero.iter().max().copied());
            prop_assert_eq!(book.best_ask(), nonzero.iter().min().copied());
        }
    }
}
