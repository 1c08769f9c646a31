// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Configuration
//!
//! This module provides the configuration value objects describing one
//! logical queue: the queue itself, how it is consumed, how messages are
//! published to it, and the exchange it is bound to.
//!
//! Every type derives `Deserialize` with `#[serde(default)]`, so an embedding
//! application can load them from whatever source it already uses.

use crate::exchange::ExchangeConfig;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueDeclareOptions,
};
use serde::Deserialize;

/// Declaration parameters of a queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub no_wait: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            durable: true,
            auto_delete: false,
            exclusive: false,
            no_wait: false,
        }
    }
}

/// Parameters used when registering a consumer on the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsumeOptions {
    /// Consumer tag, the broker generates one when empty
    pub consumer: String,
    pub auto_ack: bool,
    pub exclusive: bool,
    pub no_local: bool,
    pub no_wait: bool,
}

/// Parameters used when publishing to the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishOptions {
    pub mandatory: bool,
    pub immediate: bool,
}

/// Configuration of one logical queue and its exchange.
///
/// The queue name doubles as the routing key when the queue is bound to a
/// named exchange, and must be unique within a bootstrap batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub queue_name: String,
    pub queue: QueueOptions,
    pub consume: ConsumeOptions,
    pub publish: PublishOptions,
    pub exchange: ExchangeConfig,
}

impl QueueConfig {
    /// Creates a new queue configuration with the given name.
    ///
    /// By default, the queue is durable and bound to the default exchange.
    ///
    /// # Parameters
    /// * `name` - The name of the queue
    ///
    /// # Returns
    /// A new queue configuration with default settings
    pub fn new(name: &str) -> QueueConfig {
        QueueConfig {
            queue_name: name.to_owned(),
            ..QueueConfig::default()
        }
    }

    /// Sets the exchange the queue is bound to.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn exchange(mut self, exchange: ExchangeConfig) -> Self {
        self.exchange = exchange;
        self
    }

    /// Makes the queue transient.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn transient(mut self) -> Self {
        self.queue.durable = false;
        self
    }

    /// Makes the queue exclusive to the connection.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn exclusive(mut self) -> Self {
        self.queue.exclusive = true;
        self
    }

    /// Sets the queue to auto-delete when no longer used.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn delete(mut self) -> Self {
        self.queue.auto_delete = true;
        self
    }

    /// Sets the consumer tag used by [`crate::service::AmqpService::consume`].
    ///
    /// # Returns
    /// Self for method chaining
    pub fn consumer(mut self, tag: &str) -> Self {
        self.consume.consumer = tag.to_owned();
        self
    }

    pub(crate) fn queue_declare_options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: false,
            durable: self.queue.durable,
            exclusive: self.queue.exclusive,
            auto_delete: self.queue.auto_delete,
            nowait: self.queue.no_wait,
        }
    }

    pub(crate) fn exchange_declare_options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.exchange.durable,
            auto_delete: self.exchange.auto_delete,
            internal: self.exchange.internal,
            nowait: self.exchange.no_wait,
        }
    }

    pub(crate) fn consume_options(&self) -> BasicConsumeOptions {
        BasicConsumeOptions {
            no_local: self.consume.no_local,
            no_ack: self.consume.auto_ack,
            exclusive: self.consume.exclusive,
            nowait: self.consume.no_wait,
        }
    }

    pub(crate) fn publish_options(&self) -> BasicPublishOptions {
        BasicPublishOptions {
            mandatory: self.publish.mandatory,
            immediate: self.publish.immediate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeKind;

    #[test]
    fn default_config_values() {
        let config = QueueConfig::new("orders");
        assert_eq!(config.queue_name, "orders");
        assert!(config.queue.durable);
        assert!(!config.queue.exclusive);
        assert!(config.exchange.is_default());
        assert!(config.consume.consumer.is_empty());
    }

    #[test]
    fn json_parsing_with_overrides() {
        let raw = r#"{
            "queue_name": "billing",
            "queue": { "durable": false },
            "consume": { "consumer": "billing-worker", "auto_ack": true },
            "exchange": { "name": "payments", "kind": "topic", "durable": true }
        }"#;
        let config: QueueConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.queue_name, "billing");
        assert!(!config.queue.durable);
        assert_eq!(config.consume.consumer, "billing-worker");
        assert!(config.consume.auto_ack);
        assert_eq!(config.exchange.name, "payments");
        assert_eq!(config.exchange.kind, ExchangeKind::Topic);
        assert!(config.exchange.durable);
        // untouched sections keep their defaults
        assert!(!config.publish.mandatory);
    }

    #[test]
    fn json_parsing_empty_uses_defaults() {
        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueueConfig::default());
        assert!(config.queue.durable);
    }

    #[test]
    fn lapin_options_follow_config() {
        let config = QueueConfig::new("jobs").transient().exclusive().delete();

        let declare = config.queue_declare_options();
        assert!(!declare.durable);
        assert!(declare.exclusive);
        assert!(declare.auto_delete);
        assert!(!declare.passive);

        let consume = config.consume_options();
        assert!(!consume.no_ack);
    }
}
