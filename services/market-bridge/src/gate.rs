//! Publish gating: BBO-change detection and per-market rate throttling
//!
//! The gate decides whether a recomputed book is worth publishing. The
//! decision is a pure predicate over state captured by the caller — the
//! gate mutates nothing during evaluation; the caller records the publish
//! instant with [`PublishGate::mark_published`] after an actual publish.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use types::ids::MarketKey;

/// Best bid and best ask, either of which may be absent.
pub type Bbo = (Option<Decimal>, Option<Decimal>);

/// Whether the top of book moved between two captures.
///
/// Equality means identical price values; `None` vs `None` is unchanged,
/// and a side appearing or disappearing counts as changed.
pub fn bbo_changed(before: Bbo, after: Bbo) -> bool {
    before != after
}

/// Gate configuration, taken from the order book settings.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Refuse publication when the top-of-book prices did not move.
    pub publish_only_if_bbo_changed: bool,
    /// Minimum gap between two publishes for the same market.
    pub publishing_interval_ms: u64,
}

/// Per-market publish gate.
///
/// Holds the last-published markers; a marker is created lazily on the
/// first [`PublishGate::mark_published`] for a key.
#[derive(Debug)]
pub struct PublishGate {
    config: GateConfig,
    last_published: BTreeMap<MarketKey, DateTime<Utc>>,
}

impl PublishGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_published: BTreeMap::new(),
        }
    }

    /// Decide whether a publish for this market is eligible now.
    ///
    /// Pure predicate: evaluation never mutates the markers.
    pub fn should_publish(&self, key: &MarketKey, bbo_changed: bool, now: DateTime<Utc>) -> bool {
        if self.config.publish_only_if_bbo_changed && !bbo_changed {
            return false;
        }

        match self.last_published.get(key) {
            // First publish for this market is always allowed.
            None => true,
            Some(last) => {
                let elapsed_ms = now.signed_duration_since(*last).num_milliseconds();
                elapsed_ms > self.config.publishing_interval_ms as i64
            }
        }
    }

    /// Record an actual publish. Called by the publisher after dispatch.
    pub fn mark_published(&mut self, key: &MarketKey, now: DateTime<Utc>) {
        self.last_published.insert(key.clone(), now);
    }

    /// Last publish instant for a market, None if never published.
    pub fn last_published(&self, key: &MarketKey) -> Option<DateTime<Utc>> {
        self.last_published.get(key).copied()
    }
}
