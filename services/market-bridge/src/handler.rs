//! Event handler: the single thread of control per exchange feed
//!
//! One handler owns the order book cache, the publish gate, the symbol
//! mapper and the sink publisher for one exchange connection. Events are
//! processed strictly in arrival order; all cache reads and mutations for
//! an invocation complete before the first `.await`, and the fan-out works
//! on an owned wire snapshot, so no torn book state can ever be published.
//!
//! Per-event flow for books:
//!   capture BBO → mutate cache → capture BBO → gauges → gate →
//!   build wire book → encode → fan out → mark published
//!
//! Dropped inputs (invalid ticker, update for an uncached market, unmapped
//! market) are logged and never abort the handler.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::encode::{self, encode_order_book, encode_snapshot};
use crate::events::{BookEvent, FeedEvent, TickerEvent, TradeEvent};
use crate::gate::{bbo_changed, GateConfig, PublishGate};
use crate::metrics::{FeedMetrics, STALE_AGE_WARN_MS};
use crate::order_book::{InternalOrderBook, OrderBookCache};
use crate::publish::FanOutPublisher;
use crate::symbols::SymbolMapper;
use crate::transform::{to_quote, to_wire_order_book, to_wire_trade};

/// Per-exchange event processor.
pub struct EventHandler {
    /// Published source name: exchange plus the configured suffix.
    source: String,
    settings: Settings,
    cache: OrderBookCache,
    gate: PublishGate,
    mapper: SymbolMapper,
    publisher: FanOutPublisher,
    metrics: Arc<FeedMetrics>,
}

impl EventHandler {
    pub fn new(
        exchange: &str,
        settings: Settings,
        publisher: FanOutPublisher,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        let source = format!("{}{}", exchange, settings.exchange_name_suffix);
        let gate = PublishGate::new(GateConfig {
            publish_only_if_bbo_changed: settings.events.order_books.publish_only_if_bbo_changed,
            publishing_interval_ms: settings.events.order_books.publishing_interval_ms,
        });
        let mapper = SymbolMapper::from_pairs(
            settings
                .symbol_mapping
                .iter()
                .map(|(key, symbol)| (key.clone(), symbol.clone())),
        );

        Self {
            source,
            settings,
            cache: OrderBookCache::new(),
            gate,
            mapper,
            publisher,
            metrics,
        }
    }

    /// The published source name.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn cache(&self) -> &OrderBookCache {
        &self.cache
    }

    /// Dispatch one feed event.
    pub async fn handle(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Ticker(ticker) => self.on_ticker(&ticker).await,
            FeedEvent::BookSnapshot(book) => self.on_book(&book, true).await,
            FeedEvent::BookUpdate(book) => self.on_book(&book, false).await,
            FeedEvent::Trade(trade) => self.on_trade(&trade).await,
        }
    }

    pub async fn on_ticker(&mut self, ticker: &TickerEvent) {
        if !self.settings.events.quotes.publish {
            return;
        }

        let Some(quote) = to_quote(ticker, &self.source, &self.mapper, Utc::now()) else {
            debug!(
                market = %ticker.market_key,
                bid = ?ticker.bid,
                ask = ?ticker.ask,
                "Dropping invalid ticker"
            );
            return;
        };

        let symbol = quote.asset_pair.symbol();
        self.publisher.publish_quote(quote, &self.metrics).await;
        self.metrics.record_quote_out(&self.source, &symbol);
    }

    pub async fn on_book_snapshot(&mut self, event: &BookEvent) {
        self.on_book(event, true).await;
    }

    pub async fn on_book_update(&mut self, event: &BookEvent) {
        self.on_book(event, false).await;
    }

    async fn on_book(&mut self, event: &BookEvent, is_snapshot: bool) {
        let now = Utc::now();
        let symbol = self.symbol_label(event);
        self.metrics.record_book_in(&self.source, &symbol);
        if let Some(ms) = event.timestamp_ms {
            let age_ms = now.timestamp_millis() - ms;
            self.metrics.record_in_age(&self.source, &symbol, age_ms);
            if age_ms > STALE_AGE_WARN_MS {
                warn!(source = %self.source, %symbol, age_ms, "Received stale order book event");
            }
        }

        // Cache state is maintained even when book publishing is disabled,
        // so the snapshot endpoint and BBO gauges stay current.
        let key = &event.market_key;
        let before = (self.cache.best_bid(key), self.cache.best_ask(key));

        if is_snapshot {
            self.cache.apply_snapshot(event, now);
        } else if let Err(err) = self.cache.apply_update(event, now) {
            warn!(market = %key, error = %err, "Dropping update for uncached market");
            return;
        }

        let after = (self.cache.best_bid(key), self.cache.best_ask(key));
        self.metrics.record_bbo(&self.source, &symbol, after.0, after.1);

        if !self.settings.events.order_books.publish {
            return;
        }
        if !self.gate.should_publish(key, bbo_changed(before, after), now) {
            return;
        }

        let level_cap = self.settings.events.order_books.publish_levels;
        let wire = if is_snapshot || self.settings.events.order_books.publish_full_order_books {
            let Some(book) = self.cache.get(key) else {
                return;
            };
            to_wire_order_book(book, &self.source, &self.mapper, level_cap)
        } else {
            // Delta-only mode publishes the update's own levels, not the
            // accumulated book.
            let delta = InternalOrderBook::from_event(event, now);
            to_wire_order_book(&delta, &self.source, &self.mapper, level_cap)
        };
        let wire = match wire {
            Ok(wire) => wire,
            Err(err) => {
                warn!(market = %key, error = %err, "Dropping unpublishable order book");
                return;
            }
        };

        let encoded = if self.publisher.has_pubsub() {
            let event_time_ms = wire.timestamp_ms.or(Some(now.timestamp_millis()));
            match encode_order_book(&wire, event_time_ms, self.settings.pubsub.serializer) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(market = %key, error = %err, "Order book encoding failed");
                    return;
                }
            }
        } else {
            None
        };

        let event_time_ms = wire.timestamp_ms;
        self.publisher
            .publish_order_book(wire, encoded, &self.metrics)
            .await;
        self.gate.mark_published(key, now);
        self.metrics.record_book_out(&self.source, &symbol);

        if let Some(ms) = event_time_ms {
            let age_ms = Utc::now().timestamp_millis() - ms;
            self.metrics.record_out_age(&self.source, &symbol, age_ms);
            if age_ms > STALE_AGE_WARN_MS {
                warn!(source = %self.source, %symbol, age_ms, "Published stale order book");
            }
        }
        debug!(source = %self.source, %symbol, "Published order book");
    }

    pub async fn on_trade(&mut self, trade: &TradeEvent) {
        if !self.settings.events.trades.publish {
            return;
        }

        let wire = to_wire_trade(trade, &self.source, &self.mapper, Utc::now());
        let symbol = wire.asset_pair.symbol();
        self.publisher.publish_trade(wire, &self.metrics).await;
        self.metrics.record_trade_out(&self.source, &symbol);
    }

    /// Full-cache binary snapshot: the update envelope carrying one record
    /// per cached market. Unmapped markets are skipped with a warning.
    pub fn snapshot_payload(&self) -> Vec<u8> {
        let level_cap = self.settings.events.order_books.publish_levels;
        let mut updates = Vec::with_capacity(self.cache.len());

        for book in self.cache.iter() {
            match to_wire_order_book(book, &self.source, &self.mapper, level_cap) {
                Ok(wire) => {
                    let event_time_ms =
                        wire.timestamp_ms.or(Some(book.timestamp.timestamp_millis()));
                    updates.push(encode::to_proto_update(&wire, event_time_ms));
                }
                Err(err) => {
                    warn!(market = %book.market_key, error = %err, "Skipping market in snapshot");
                }
            }
        }

        encode_snapshot(updates)
    }

    /// Encode the full-cache snapshot and dispatch it to the pub/sub sink.
    pub async fn publish_snapshot(&self) {
        let bytes = self.snapshot_payload();
        self.publisher
            .publish_snapshot_bytes(bytes, &self.metrics)
            .await;
    }

    /// "BASE/QUOTE" label for logs and metric series: the mapped symbol
    /// when one exists, else the feed-advertised pair.
    fn symbol_label(&self, event: &BookEvent) -> String {
        match self.mapper.resolve(&event.market_key) {
            Some(pair) => pair.symbol(),
            None => event.symbol(),
        }
    }
}
