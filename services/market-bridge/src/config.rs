//! Service settings
//!
//! Deserialized once at startup and validated before any sink is built.
//! Every toggle defaults to the permissive side: publish everything, gate
//! on BBO changes, 1s interval, full books, unbounded levels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::encode::Serializer;

/// Invalid settings detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("settings are not valid json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("queue sink enabled but {0} destination is empty")]
    EmptyDestination(&'static str),
}

/// Per-event-kind publish toggles and order book behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub quotes: PublishToggle,
    pub order_books: OrderBookSettings,
    pub trades: PublishToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishToggle {
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBookSettings {
    pub publish: bool,
    /// Skip publishes where the top of book did not move.
    pub publish_only_if_bbo_changed: bool,
    /// Minimum gap between publishes for one market.
    pub publishing_interval_ms: u64,
    /// Publish the full cached book; false publishes only the delta levels.
    pub publish_full_order_books: bool,
    /// Per-side level cap; zero or negative means unbounded.
    pub publish_levels: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub enabled: bool,
    pub quotes_destination: String,
    pub order_books_destination: String,
    pub trades_destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubSettings {
    pub enabled: bool,
    pub serializer: Serializer,
}

/// Root settings object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub events: EventSettings,
    pub queue: QueueSettings,
    pub broadcast: BroadcastSettings,
    pub pubsub: PubSubSettings,
    /// Appended to the exchange name to form the published source.
    pub exchange_name_suffix: String,
    /// Market key → "BASE/QUOTE" symbol.
    pub symbol_mapping: BTreeMap<String, String>,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            quotes: PublishToggle::default(),
            order_books: OrderBookSettings::default(),
            trades: PublishToggle::default(),
        }
    }
}

impl Default for PublishToggle {
    fn default() -> Self {
        Self { publish: true }
    }
}

impl Default for OrderBookSettings {
    fn default() -> Self {
        Self {
            publish: true,
            publish_only_if_bbo_changed: true,
            publishing_interval_ms: 1000,
            publish_full_order_books: true,
            publish_levels: 0,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            quotes_destination: "quotes".to_string(),
            order_books_destination: "order-books".to_string(),
            trades_destination: "trades".to_string(),
        }
    }
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            serializer: Serializer::Protobuf,
        }
    }
}

impl Settings {
    /// Parse and validate settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would silently drop data at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.enabled {
            if self.queue.quotes_destination.is_empty() {
                return Err(ConfigError::EmptyDestination("quotes"));
            }
            if self.queue.order_books_destination.is_empty() {
                return Err(ConfigError::EmptyDestination("order books"));
            }
            if self.queue.trades_destination.is_empty() {
                return Err(ConfigError::EmptyDestination("trades"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.events.quotes.publish);
        assert!(settings.events.order_books.publish);
        assert!(settings.events.order_books.publish_only_if_bbo_changed);
        assert_eq!(settings.events.order_books.publishing_interval_ms, 1000);
        assert!(settings.events.order_books.publish_full_order_books);
        assert_eq!(settings.events.order_books.publish_levels, 0);
        assert!(!settings.queue.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json_str(
            r#"{
                "events": { "order_books": { "publishing_interval_ms": 250 } },
                "pubsub": { "enabled": true, "serializer": "json" },
                "symbol_mapping": { "XBTUSD": "BTC/USD" }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.events.order_books.publishing_interval_ms, 250);
        // Untouched siblings keep their defaults
        assert!(settings.events.order_books.publish_only_if_bbo_changed);
        assert!(settings.events.quotes.publish);
        assert_eq!(settings.pubsub.serializer, Serializer::Json);
        assert_eq!(settings.symbol_mapping["XBTUSD"], "BTC/USD");
    }

    #[test]
    fn test_unknown_serializer_rejected() {
        let err = Settings::from_json_str(r#"{ "pubsub": { "serializer": "msgpack" } }"#);
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_destination_rejected_when_queue_enabled() {
        let err = Settings::from_json_str(
            r#"{ "queue": { "enabled": true, "order_books_destination": "" } }"#,
        );
        assert!(matches!(
            err,
            Err(ConfigError::EmptyDestination("order books"))
        ));

        // Same shape is fine while the queue stays disabled
        let ok = Settings::from_json_str(r#"{ "queue": { "order_books_destination": "" } }"#);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_exchange_name_suffix_default_empty() {
        assert_eq!(Settings::default().exchange_name_suffix, "");
    }
}
