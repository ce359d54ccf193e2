//! Binary wire schema messages
//!
//! Hand-written prost messages mirroring the `orderbooks` schema consumed
//! by downstream subscribers. Field names and numbers follow the schema
//! source verbatim (`source`, `assetPair`, `bids`, `asks`, `timestamp`,
//! envelope fields `orderBooks` / `orderBookUpdates`).
//!
//! Both response envelopes exist in the schema. The snapshot path
//! deliberately reuses [`GetOrderBookUpdateResponse`] — downstream
//! consumers decode snapshots with the update envelope, so
//! [`GetOrderBooksResponse`] stays defined for schema completeness only.

/// Base/quote pair as carried on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssetPair {
    #[prost(string, tag = "1")]
    pub base: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub quote: ::prost::alloc::string::String,
}

/// One price level.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct OrderBookLevel {
    #[prost(double, tag = "1")]
    pub price: f64,
    #[prost(double, tag = "2")]
    pub volume: f64,
}

/// One market's published book state.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrderBookUpdate {
    #[prost(string, tag = "1")]
    pub source: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub asset_pair: ::core::option::Option<AssetPair>,
    #[prost(message, repeated, tag = "3")]
    pub bids: ::prost::alloc::vec::Vec<OrderBookLevel>,
    #[prost(message, repeated, tag = "4")]
    pub asks: ::prost::alloc::vec::Vec<OrderBookLevel>,
    #[prost(message, optional, tag = "5")]
    pub timestamp: ::core::option::Option<::prost_types::Timestamp>,
}

/// Envelope for full order book responses.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetOrderBooksResponse {
    #[prost(message, repeated, tag = "1")]
    pub order_books: ::prost::alloc::vec::Vec<OrderBookUpdate>,
}

/// Envelope for incremental update responses; also used for full-cache
/// snapshots (one entry per cached market).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetOrderBookUpdateResponse {
    #[prost(message, repeated, tag = "1")]
    pub order_book_updates: ::prost::alloc::vec::Vec<OrderBookUpdate>,
}
