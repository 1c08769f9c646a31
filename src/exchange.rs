// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Configuration
//!
//! Exchanges are the routing mechanism of the broker. A queue configuration
//! carries one nested `ExchangeConfig`; an empty exchange name means the
//! broker's default exchange, which is neither declared nor bound explicitly.

use serde::Deserialize;

/// Represents the types of exchanges available in RabbitMQ.
///
/// Each exchange type has specific routing behavior:
/// - Direct: Routes messages to queues based on an exact match of routing keys
/// - Fanout: Broadcasts messages to all bound queues regardless of routing keys
/// - Topic: Routes messages based on wildcard pattern matching of routing keys
/// - Headers: Routes based on message header values instead of routing keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl From<&ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: &ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Declaration parameters of the exchange a queue is bound to.
///
/// Built with the same chaining style as the queue configuration:
///
/// ```
/// use amqp_toolkit::exchange::ExchangeConfig;
///
/// let exchange = ExchangeConfig::new("orders").fanout().durable();
/// assert!(!exchange.is_default());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub no_wait: bool,
}

impl ExchangeConfig {
    /// Creates a direct, non-durable exchange configuration with the given name.
    pub fn new(name: &str) -> ExchangeConfig {
        ExchangeConfig {
            name: name.to_owned(),
            ..ExchangeConfig::default()
        }
    }

    /// Returns true when the configuration targets the broker's default exchange.
    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }

    /// Sets the exchange type.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the exchange type to Direct.
    pub fn direct(self) -> Self {
        self.kind(ExchangeKind::Direct)
    }

    /// Sets the exchange type to Fanout.
    pub fn fanout(self) -> Self {
        self.kind(ExchangeKind::Fanout)
    }

    /// Sets the exchange type to Topic.
    pub fn topic(self) -> Self {
        self.kind(ExchangeKind::Topic)
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the exchange to auto-delete when no longer used.
    pub fn delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Makes the exchange internal, preventing direct publishing.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Sets no_wait flag, making the declaration non-blocking.
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_exchange_is_unnamed_direct() {
        let exchange = ExchangeConfig::default();
        assert!(exchange.is_default());
        assert_eq!(exchange.kind, ExchangeKind::Direct);
    }

    #[test]
    fn builder_sets_flags() {
        let exchange = ExchangeConfig::new("events").topic().durable().internal();
        assert_eq!(exchange.name, "events");
        assert_eq!(exchange.kind, ExchangeKind::Topic);
        assert!(exchange.durable);
        assert!(exchange.internal);
        assert!(!exchange.auto_delete);
    }

    #[test]
    fn kind_maps_to_lapin() {
        assert!(matches!(
            lapin::ExchangeKind::from(&ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        ));
        assert!(matches!(
            lapin::ExchangeKind::from(&ExchangeKind::Headers),
            lapin::ExchangeKind::Headers
        ));
    }

    #[test]
    fn kind_parses_lowercase() {
        let kind: ExchangeKind = serde_json::from_str("\"fanout\"").unwrap();
        assert_eq!(kind, ExchangeKind::Fanout);
    }
}
