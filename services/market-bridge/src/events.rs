//! Inbound normalized feed events
//!
//! The connectivity layer delivers four event kinds, already normalized
//! across exchanges: tickers, full book snapshots, incremental book updates,
//! and trades. Each carries the exchange name, the exchange-assigned market
//! key, and the base/quote assets the feed advertises for it.
//!
//! Level prices and sizes arrive as raw decimal strings and are parsed with
//! `rust_decimal` when the cache applies them; a size of 0 on an update is a
//! removal signal, not a resting order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::MarketKey;
use types::order::Side;

/// A single raw price level as received from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLevel {
    /// Raw decimal price string.
    pub price: String,
    /// Raw decimal size string; "0" signals removal on updates.
    pub size: String,
}

impl RawLevel {
    pub fn new(price: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            size: size.into(),
        }
    }
}

/// Top-of-book ticker event.
///
/// Bid or ask may be absent — some venues emit one-sided tickers; those
/// never produce a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEvent {
    /// Exchange name, raw as received.
    pub exchange: String,
    /// Exchange-assigned market identifier.
    pub market_key: MarketKey,
    /// Base asset advertised by the feed.
    pub base: String,
    /// Quote asset advertised by the feed.
    pub quote: String,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    /// Upstream event time in Unix milliseconds, when the venue provides one.
    pub timestamp_ms: Option<i64>,
}

/// Full snapshot or incremental update of one market's book.
///
/// The two kinds share a shape; the handler decides whether the levels
/// replace the book wholesale or patch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEvent {
    pub exchange: String,
    pub market_key: MarketKey,
    pub base: String,
    pub quote: String,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
    /// Upstream event time in Unix milliseconds; absent on most exchanges.
    pub timestamp_ms: Option<i64>,
}

impl BookEvent {
    /// "BASE/QUOTE" label for logging and metrics.
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

/// A public trade, passed through to the queue sink unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub exchange: String,
    pub market_key: MarketKey,
    pub base: String,
    pub quote: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub side: Side,
    pub timestamp_ms: Option<i64>,
}

/// All events consumed by the bridge, for dispatch loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum FeedEvent {
    Ticker(TickerEvent),
    BookSnapshot(BookEvent),
    BookUpdate(BookEvent),
    Trade(TradeEvent),
}

impl FeedEvent {
    /// Get the event kind as a string label for logging.
    pub fn kind_label(&self) -> &'static str {
        match self {
            FeedEvent::Ticker(_) => "Ticker",
            FeedEvent::BookSnapshot(_) => "BookSnapshot",
            FeedEvent::BookUpdate(_) => "BookUpdate",
            FeedEvent::Trade(_) => "Trade",
        }
    }

    /// Extract the market key from the event.
    pub fn market_key(&self) -> &MarketKey {
        match self {
            FeedEvent::Ticker(e) => &e.market_key,
            FeedEvent::BookSnapshot(e) => &e.market_key,
            FeedEvent::BookUpdate(e) => &e.market_key,
            FeedEvent::Trade(e) => &e.market_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_book_event() -> BookEvent {
        BookEvent {
            exchange: "binance".to_string(),
            market_key: MarketKey::new("BTCUSDT"),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            bids: vec![RawLevel::new("50000", "1.5")],
            asks: vec![RawLevel::new("50100", "2.0")],
            timestamp_ms: Some(1708123456789),
        }
    }

    #[test]
    fn test_symbol_label() {
        assert_eq!(sample_book_event().symbol(), "BTC/USDT");
    }

    #[test]
    fn test_kind_label() {
        let event = FeedEvent::BookSnapshot(sample_book_event());
        assert_eq!(event.kind_label(), "BookSnapshot");
        assert_eq!(event.market_key().as_str(), "BTCUSDT");
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = FeedEvent::Trade(TradeEvent {
            exchange: "binance".to_string(),
            market_key: MarketKey::new("BTCUSDT"),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            price: Decimal::new(500005, 1),
            amount: Decimal::new(25, 2),
            side: Side::Buy,
            timestamp_ms: None,
        });
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: FeedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }
}
