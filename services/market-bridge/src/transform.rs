//! Internal → wire model transformation
//!
//! Builds the bounded, rounded, symbol-annotated shapes that go out to the
//! sinks: [`WireOrderBook`] from a cached book and [`Quote`] from a ticker.
//!
//! Transformation rules:
//! - bids strictly descending, asks strictly ascending by numeric price
//! - levels with price 0 or size 0 are skipped (price 0 is never a valid
//!   resting level, even if present in the cache)
//! - prices and sizes rounded to the canonical form (max 8 fractional
//!   digits, trailing zeros stripped)
//! - each side capped at the configured level count; side volumes sum the
//!   sizes of included levels only

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{AssetPair, MarketKey};
use types::numeric::round_canonical;

use crate::events::{TickerEvent, TradeEvent};
use crate::order_book::InternalOrderBook;
use crate::symbols::SymbolMapper;
use types::order::Side;

/// Errors from the internal → wire transformation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The market key has no symbol mapping and is not itself a symbol;
    /// the book cannot be represented on the wire.
    #[error("no symbol mapping for market {0}")]
    UnmappedMarket(MarketKey),
}

/// One published price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLevel {
    pub price: Decimal,
    pub volume: Decimal,
}

/// The public order book shape, rebuilt on every publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderBook {
    /// Publishing source: exchange name plus the configured suffix.
    pub source: String,
    /// Concatenated symbol with no separator ("BTCUSDT").
    pub asset: String,
    pub asset_pair: AssetPair,
    /// ISO-8601 instant of the underlying book state.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    /// Bids in descending price order (best first).
    pub bids: Vec<WireLevel>,
    /// Asks in ascending price order (best first).
    pub asks: Vec<WireLevel>,
    /// Sum of included bid sizes.
    pub bids_volume: Decimal,
    /// Sum of included ask sizes.
    pub asks_volume: Decimal,
}

/// The public top-of-book quote built from a ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub source: String,
    pub asset_pair: AssetPair,
    pub asset: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// The public trade shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTrade {
    pub source: String,
    pub asset_pair: AssetPair,
    pub asset: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

/// Build the wire order book from a cached book.
///
/// `level_cap` bounds each side when positive; zero or negative means
/// unbounded.
pub fn to_wire_order_book(
    book: &InternalOrderBook,
    source: &str,
    mapper: &SymbolMapper,
    level_cap: i32,
) -> Result<WireOrderBook, TransformError> {
    let asset_pair = mapper
        .resolve(&book.market_key)
        .ok_or_else(|| TransformError::UnmappedMarket(book.market_key.clone()))?;

    let (bids, bids_volume) = take_levels(book.bids_descending(), level_cap);
    let (asks, asks_volume) = take_levels(book.asks_ascending(), level_cap);

    Ok(WireOrderBook {
        source: source.to_string(),
        asset: asset_pair.concatenated(),
        asset_pair,
        timestamp: iso_timestamp(book.timestamp),
        timestamp_ms: book.timestamp_ms,
        bids,
        asks,
        bids_volume,
        asks_volume,
    })
}

/// Build a quote from a ticker event.
///
/// Returns None unless both bid and ask are present and strictly positive;
/// invalid tickers are dropped upstream of publication.
pub fn to_quote(ticker: &TickerEvent, source: &str, mapper: &SymbolMapper, now: DateTime<Utc>) -> Option<Quote> {
    let bid = ticker.bid?;
    let ask = ticker.ask?;
    if bid <= Decimal::ZERO || ask <= Decimal::ZERO {
        return None;
    }

    let asset_pair = mapper
        .resolve(&ticker.market_key)
        .unwrap_or_else(|| AssetPair::new(ticker.base.clone(), ticker.quote.clone()));

    let timestamp = ticker
        .timestamp_ms
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or(now);

    Some(Quote {
        source: source.to_string(),
        asset: asset_pair.concatenated(),
        asset_pair,
        timestamp: iso_timestamp(timestamp),
        timestamp_ms: ticker.timestamp_ms,
        bid: round_canonical(bid),
        ask: round_canonical(ask),
    })
}

/// Build a wire trade from a trade event.
///
/// Trades are a pass-through: price and amount go out exactly as received,
/// with only source, symbol annotation, and timestamps added.
pub fn to_wire_trade(
    trade: &TradeEvent,
    source: &str,
    mapper: &SymbolMapper,
    now: DateTime<Utc>,
) -> WireTrade {
    let asset_pair = mapper
        .resolve(&trade.market_key)
        .unwrap_or_else(|| AssetPair::new(trade.base.clone(), trade.quote.clone()));

    let timestamp = trade
        .timestamp_ms
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or(now);

    WireTrade {
        source: source.to_string(),
        asset: asset_pair.concatenated(),
        asset_pair,
        side: trade.side,
        price: trade.price,
        amount: trade.amount,
        timestamp: iso_timestamp(timestamp),
        timestamp_ms: trade.timestamp_ms,
    }
}

/// Walk a sorted side, skipping empty levels, rounding, accumulating
/// volume, and stopping at the cap.
fn take_levels(
    levels: impl Iterator<Item = (Decimal, Decimal)>,
    level_cap: i32,
) -> (Vec<WireLevel>, Decimal) {
    let mut out = Vec::new();
    let mut volume = Decimal::ZERO;

    for (price, size) in levels {
        if price.is_zero() || size.is_zero() {
            continue;
        }

        volume += size;
        out.push(WireLevel {
            price: round_canonical(price),
            volume: round_canonical(size),
        });

        if level_cap > 0 && out.len() >= level_cap as usize {
            break;
        }
    }

    (out, volume)
}

/// ISO-8601 with millisecond precision and a Z suffix.
fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
