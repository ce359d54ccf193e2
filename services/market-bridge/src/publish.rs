//! Sink fan-out
//!
//! Three transport seams carry published data: a message queue (structured
//! payloads routed by destination), a broadcast channel (structured
//! payloads, no routing), and a pub/sub socket (pre-encoded bytes under a
//! topic). [`FanOutPublisher`] dispatches one payload to every enabled
//! sink concurrently; a failing sink is logged and counted, and never
//! blocks or fails the others.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::config::Settings;
use crate::metrics::FeedMetrics;
use crate::transform::{Quote, WireOrderBook, WireTrade};

/// Topic under which book bytes go out on the pub/sub socket.
pub const ORDERBOOKS_TOPIC: &str = "orderbooks";

/// Error from a single sink dispatch.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Structured payload carried by the queue and broadcast sinks.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueuePayload {
    Quote(Quote),
    OrderBook(WireOrderBook),
    Trade(WireTrade),
}

/// Message-queue transport: routes by destination name.
#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn send(&self, destination: &str, payload: QueuePayload) -> Result<(), SinkError>;
}

/// Broadcast transport: every connected consumer gets every payload.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn broadcast(&self, payload: QueuePayload) -> Result<(), SinkError>;
}

/// Pub/sub transport: raw bytes under a topic.
#[async_trait]
pub trait PubSubSink: Send + Sync {
    async fn send(&self, topic: &str, bytes: Vec<u8>) -> Result<(), SinkError>;
}

/// Queue destinations per payload kind.
#[derive(Debug, Clone, Default)]
pub struct QueueDestinations {
    pub quotes: String,
    pub order_books: String,
    pub trades: String,
}

/// Concurrent dispatch to all configured sinks.
///
/// Disabled sinks are simply absent. Each configured sink's failure is
/// isolated: logged, counted, and swallowed.
pub struct FanOutPublisher {
    queue: Option<Arc<dyn QueueSink>>,
    broadcast: Option<Arc<dyn BroadcastSink>>,
    pubsub: Option<Arc<dyn PubSubSink>>,
    destinations: QueueDestinations,
}

impl FanOutPublisher {
    pub fn new(
        queue: Option<Arc<dyn QueueSink>>,
        broadcast: Option<Arc<dyn BroadcastSink>>,
        pubsub: Option<Arc<dyn PubSubSink>>,
        destinations: QueueDestinations,
    ) -> Self {
        Self {
            queue,
            broadcast,
            pubsub,
            destinations,
        }
    }

    /// Build a publisher from validated settings: a sink whose enable flag
    /// is false is dropped even when a transport was supplied for it, and
    /// the queue destinations come from the settings.
    pub fn from_settings(
        settings: &Settings,
        queue: Option<Arc<dyn QueueSink>>,
        broadcast: Option<Arc<dyn BroadcastSink>>,
        pubsub: Option<Arc<dyn PubSubSink>>,
    ) -> Self {
        Self {
            queue: if settings.queue.enabled { queue } else { None },
            broadcast: if settings.broadcast.enabled {
                broadcast
            } else {
                None
            },
            pubsub: if settings.pubsub.enabled { pubsub } else { None },
            destinations: QueueDestinations {
                quotes: settings.queue.quotes_destination.clone(),
                order_books: settings.queue.order_books_destination.clone(),
                trades: settings.queue.trades_destination.clone(),
            },
        }
    }

    /// Send one book to all enabled sinks: structured to queue and
    /// broadcast, `encoded` bytes to pub/sub under the orderbooks topic.
    pub async fn publish_order_book(
        &self,
        book: WireOrderBook,
        encoded: Option<Vec<u8>>,
        metrics: &FeedMetrics,
    ) {
        let queue_fut = async {
            match &self.queue {
                Some(queue) => Some(
                    queue
                        .send(
                            &self.destinations.order_books,
                            QueuePayload::OrderBook(book.clone()),
                        )
                        .await,
                ),
                None => None,
            }
        };
        let broadcast_fut = async {
            match &self.broadcast {
                Some(broadcast) => {
                    Some(broadcast.broadcast(QueuePayload::OrderBook(book.clone())).await)
                }
                None => None,
            }
        };
        let pubsub_fut = async {
            match (&self.pubsub, encoded) {
                (Some(pubsub), Some(bytes)) => Some(pubsub.send(ORDERBOOKS_TOPIC, bytes).await),
                _ => None,
            }
        };

        let (queue_res, broadcast_res, pubsub_res) =
            tokio::join!(queue_fut, broadcast_fut, pubsub_fut);

        record_outcome("queue", queue_res, metrics);
        record_outcome("broadcast", broadcast_res, metrics);
        record_outcome("pubsub", pubsub_res, metrics);
    }

    /// Quotes go to the queue only.
    pub async fn publish_quote(&self, quote: Quote, metrics: &FeedMetrics) {
        if let Some(queue) = &self.queue {
            let result = queue
                .send(&self.destinations.quotes, QueuePayload::Quote(quote))
                .await;
            record_outcome("queue", Some(result), metrics);
        }
    }

    /// Trades go to the queue only.
    pub async fn publish_trade(&self, trade: WireTrade, metrics: &FeedMetrics) {
        if let Some(queue) = &self.queue {
            let result = queue
                .send(&self.destinations.trades, QueuePayload::Trade(trade))
                .await;
            record_outcome("queue", Some(result), metrics);
        }
    }

    /// Send pre-encoded snapshot bytes to the pub/sub sink.
    pub async fn publish_snapshot_bytes(&self, bytes: Vec<u8>, metrics: &FeedMetrics) {
        if let Some(pubsub) = &self.pubsub {
            let result = pubsub.send(ORDERBOOKS_TOPIC, bytes).await;
            record_outcome("pubsub", Some(result), metrics);
        }
    }

    pub fn has_pubsub(&self) -> bool {
        self.pubsub.is_some()
    }
}

fn record_outcome(sink: &str, outcome: Option<Result<(), SinkError>>, metrics: &FeedMetrics) {
    if let Some(Err(err)) = outcome {
        warn!(sink, error = %err, "sink dispatch failed");
        metrics.record_sink_error(sink);
    }
}
