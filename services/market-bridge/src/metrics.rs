//! In-process feed metrics
//!
//! Counters and gauges updated on the hot path and exported on demand as a
//! plain snapshot. Ingress/egress counters are kept per (source, symbol)
//! series with lock-free global totals alongside; event ages feed both a
//! last-value gauge per series and a bounded sample window for percentile
//! queries. Labelled state lives behind mutexes so export sees a consistent
//! view per label set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rust_decimal::Decimal;

/// Events older than this on arrival or departure get a staleness warning.
pub const STALE_AGE_WARN_MS: i64 = 200;

/// Sample window size for the age distributions.
const AGE_WINDOW: usize = 1000;

/// Label for a counter or gauge series: (source, symbol).
pub type SeriesKey = (String, String);

/// Feed-wide metrics registry.
#[derive(Debug)]
pub struct FeedMetrics {
    book_in_total: AtomicU64,
    book_out_total: AtomicU64,
    quotes_out_total: AtomicU64,
    trades_out_total: AtomicU64,
    sink_errors: AtomicU64,
    book_in_count: Mutex<BTreeMap<SeriesKey, u64>>,
    book_out_count: Mutex<BTreeMap<SeriesKey, u64>>,
    quotes_out_count: Mutex<BTreeMap<SeriesKey, u64>>,
    trades_out_count: Mutex<BTreeMap<SeriesKey, u64>>,
    in_age_ms: Mutex<BTreeMap<SeriesKey, i64>>,
    out_age_ms: Mutex<BTreeMap<SeriesKey, i64>>,
    in_age_window: Mutex<AgeTracker>,
    out_age_window: Mutex<AgeTracker>,
    best_bid: Mutex<BTreeMap<SeriesKey, Decimal>>,
    best_ask: Mutex<BTreeMap<SeriesKey, Decimal>>,
    sink_error_counts: Mutex<BTreeMap<String, u64>>,
}

/// Point-in-time export of all series.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub book_in_total: u64,
    pub book_out_total: u64,
    pub quotes_out_total: u64,
    pub trades_out_total: u64,
    pub sink_errors: u64,
    pub book_in_count: BTreeMap<SeriesKey, u64>,
    pub book_out_count: BTreeMap<SeriesKey, u64>,
    pub quotes_out_count: BTreeMap<SeriesKey, u64>,
    pub trades_out_count: BTreeMap<SeriesKey, u64>,
    pub in_age_ms: BTreeMap<SeriesKey, i64>,
    pub out_age_ms: BTreeMap<SeriesKey, i64>,
    pub best_bid: BTreeMap<SeriesKey, Decimal>,
    pub best_ask: BTreeMap<SeriesKey, Decimal>,
    pub sink_error_counts: BTreeMap<String, u64>,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self {
            book_in_total: AtomicU64::new(0),
            book_out_total: AtomicU64::new(0),
            quotes_out_total: AtomicU64::new(0),
            trades_out_total: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            book_in_count: Mutex::new(BTreeMap::new()),
            book_out_count: Mutex::new(BTreeMap::new()),
            quotes_out_count: Mutex::new(BTreeMap::new()),
            trades_out_count: Mutex::new(BTreeMap::new()),
            in_age_ms: Mutex::new(BTreeMap::new()),
            out_age_ms: Mutex::new(BTreeMap::new()),
            in_age_window: Mutex::new(AgeTracker::new(AGE_WINDOW)),
            out_age_window: Mutex::new(AgeTracker::new(AGE_WINDOW)),
            best_bid: Mutex::new(BTreeMap::new()),
            best_ask: Mutex::new(BTreeMap::new()),
            sink_error_counts: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record_book_in(&self, source: &str, symbol: &str) {
        self.book_in_total.fetch_add(1, Ordering::Relaxed);
        bump(&self.book_in_count, source, symbol);
    }

    pub fn record_book_out(&self, source: &str, symbol: &str) {
        self.book_out_total.fetch_add(1, Ordering::Relaxed);
        bump(&self.book_out_count, source, symbol);
    }

    pub fn record_quote_out(&self, source: &str, symbol: &str) {
        self.quotes_out_total.fetch_add(1, Ordering::Relaxed);
        bump(&self.quotes_out_count, source, symbol);
    }

    pub fn record_trade_out(&self, source: &str, symbol: &str) {
        self.trades_out_total.fetch_add(1, Ordering::Relaxed);
        bump(&self.trades_out_count, source, symbol);
    }

    /// Ingress age: how old the event already was when received. Updates
    /// the per-series gauge and the distribution window.
    pub fn record_in_age(&self, source: &str, symbol: &str, age_ms: i64) {
        if let Ok(mut gauges) = self.in_age_ms.lock() {
            gauges.insert((source.to_string(), symbol.to_string()), age_ms);
        }
        if let Ok(mut window) = self.in_age_window.lock() {
            window.record(age_ms);
        }
    }

    /// Egress age: event age at the moment of publication.
    pub fn record_out_age(&self, source: &str, symbol: &str, age_ms: i64) {
        if let Ok(mut gauges) = self.out_age_ms.lock() {
            gauges.insert((source.to_string(), symbol.to_string()), age_ms);
        }
        if let Ok(mut window) = self.out_age_window.lock() {
            window.record(age_ms);
        }
    }

    /// Top-of-book gauges; an absent side clears nothing, it just skips.
    pub fn record_bbo(
        &self,
        source: &str,
        symbol: &str,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
    ) {
        let key = (source.to_string(), symbol.to_string());
        if let Some(bid) = bid {
            if let Ok(mut gauges) = self.best_bid.lock() {
                gauges.insert(key.clone(), bid);
            }
        }
        if let Some(ask) = ask {
            if let Ok(mut gauges) = self.best_ask.lock() {
                gauges.insert(key, ask);
            }
        }
    }

    /// One failed sink dispatch, counted globally and per sink name.
    pub fn record_sink_error(&self, sink: &str) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut counts) = self.sink_error_counts.lock() {
            *counts.entry(sink.to_string()).or_insert(0) += 1;
        }
    }

    pub fn book_in_total(&self) -> u64 {
        self.book_in_total.load(Ordering::Relaxed)
    }

    pub fn book_out_total(&self) -> u64 {
        self.book_out_total.load(Ordering::Relaxed)
    }

    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    /// Percentile of the ingress age window (0-100), None with no samples.
    pub fn in_age_percentile(&self, p: usize) -> Option<i64> {
        self.in_age_window.lock().ok().and_then(|w| w.percentile(p))
    }

    /// Percentile of the egress age window (0-100), None with no samples.
    pub fn out_age_percentile(&self, p: usize) -> Option<i64> {
        self.out_age_window.lock().ok().and_then(|w| w.percentile(p))
    }

    /// Mean ingress age over the window, None with no samples.
    pub fn in_age_average(&self) -> Option<i64> {
        self.in_age_window.lock().ok().and_then(|w| w.average())
    }

    pub fn export(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            book_in_total: self.book_in_total.load(Ordering::Relaxed),
            book_out_total: self.book_out_total.load(Ordering::Relaxed),
            quotes_out_total: self.quotes_out_total.load(Ordering::Relaxed),
            trades_out_total: self.trades_out_total.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            book_in_count: cloned(&self.book_in_count),
            book_out_count: cloned(&self.book_out_count),
            quotes_out_count: cloned(&self.quotes_out_count),
            trades_out_count: cloned(&self.trades_out_count),
            in_age_ms: cloned(&self.in_age_ms),
            out_age_ms: cloned(&self.out_age_ms),
            best_bid: cloned(&self.best_bid),
            best_ask: cloned(&self.best_ask),
            sink_error_counts: cloned(&self.sink_error_counts),
        }
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counters: &Mutex<BTreeMap<SeriesKey, u64>>, source: &str, symbol: &str) {
    if let Ok(mut counters) = counters.lock() {
        *counters
            .entry((source.to_string(), symbol.to_string()))
            .or_insert(0) += 1;
    }
}

fn cloned<K: Clone + Ord, V: Clone>(map: &Mutex<BTreeMap<K, V>>) -> BTreeMap<K, V> {
    map.lock().map(|m| m.clone()).unwrap_or_default()
}

/// Bounded sliding window of age samples for percentile queries.
#[derive(Debug)]
pub struct AgeTracker {
    samples: Vec<i64>,
    max_samples: usize,
}

impl AgeTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record one sample, evicting the oldest when the window is full.
    pub fn record(&mut self, value: i64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<i64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let idx = (p as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    /// Mean over the window.
    pub fn average(&self) -> Option<i64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: i64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as i64)
    }

    /// Number of samples held.
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
