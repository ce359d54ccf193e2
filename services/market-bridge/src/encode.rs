//! Wire encoding for the pub/sub transport
//!
//! The queue and broadcast sinks receive structured payloads; only the
//! pub/sub sink carries bytes, produced here in the configured encoding.
//! Protobuf wraps one or many wire books in the update-response envelope;
//! JSON serializes the wire book shape directly.
//!
//! An encoding failure is fatal to that publish only, never to the process.

use prost::Message;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proto;
use crate::transform::WireOrderBook;

/// Encoding selected for the pub/sub sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    Protobuf,
    Json,
}

/// Errors from payload encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Milliseconds → schema timestamp: integer seconds plus the millisecond
/// remainder as nanoseconds. None stays absent on the wire.
pub fn proto_timestamp(timestamp_ms: Option<i64>) -> Option<prost_types::Timestamp> {
    timestamp_ms.map(|ms| prost_types::Timestamp {
        seconds: ms.div_euclid(1000),
        nanos: (ms.rem_euclid(1000) * 1_000_000) as i32,
    })
}

/// Map a wire book to the schema update record.
///
/// `event_time_ms` is the instant of the underlying book state; the wire
/// book's own optional upstream timestamp is not reused here because the
/// schema timestamp must always reflect the book mutation time.
pub fn to_proto_update(wire: &WireOrderBook, event_time_ms: Option<i64>) -> proto::OrderBookUpdate {
    proto::OrderBookUpdate {
        source: wire.source.clone(),
        asset_pair: Some(proto::AssetPair {
            base: wire.asset_pair.base.clone(),
            quote: wire.asset_pair.quote.clone(),
        }),
        bids: wire
            .bids
            .iter()
            .map(|l| proto::OrderBookLevel {
                price: dec_to_f64(l.price),
                volume: dec_to_f64(l.volume),
            })
            .collect(),
        asks: wire
            .asks
            .iter()
            .map(|l| proto::OrderBookLevel {
                price: dec_to_f64(l.price),
                volume: dec_to_f64(l.volume),
            })
            .collect(),
        timestamp: proto_timestamp(event_time_ms),
    }
}

/// Encode a single book for the pub/sub sink in the configured encoding.
pub fn encode_order_book(
    wire: &WireOrderBook,
    event_time_ms: Option<i64>,
    serializer: Serializer,
) -> Result<Vec<u8>, EncodeError> {
    match serializer {
        Serializer::Protobuf => {
            let envelope = proto::GetOrderBookUpdateResponse {
                order_book_updates: vec![to_proto_update(wire, event_time_ms)],
            };
            Ok(envelope.encode_to_vec())
        }
        Serializer::Json => Ok(serde_json::to_vec(wire)?),
    }
}

/// Encode a full-cache snapshot: the update-response envelope carrying one
/// record per cached market.
pub fn encode_snapshot(updates: Vec<proto::OrderBookUpdate>) -> Vec<u8> {
    let envelope = proto::GetOrderBookUpdateResponse {
        order_book_updates: updates,
    };
    envelope.encode_to_vec()
}

fn dec_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
