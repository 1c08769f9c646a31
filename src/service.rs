// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Service
//!
//! A `QueueService` is the handle on one logical queue that the topology
//! bootstrapper drives: it can declare its queue and exchange, hand out
//! channels, and report its configuration.
//!
//! `AmqpService` is the lapin-backed implementation. It takes an already
//! connected `lapin::Connection`; dialing and authentication belong to the
//! embedding application.

use crate::{
    channel::AmqpChannel, envelope::Envelope, errors::AmqpError, otel, queue::QueueConfig,
};
use async_trait::async_trait;
use lapin::{
    types::{FieldTable, ShortString},
    Connection, Consumer,
};
#[cfg(test)]
use mockall::automock;
use opentelemetry::Context;
use std::{future::Future, sync::Arc};
use tracing::{debug, error};
use uuid::Uuid;

/// Capability over one logical queue used by the topology bootstrapper.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Declares the queue described by [`QueueService::config`].
    async fn create_queue(&self) -> Result<(), AmqpError>;

    /// Declares the exchange described by [`QueueService::config`].
    async fn create_exchange(&self) -> Result<(), AmqpError>;

    /// Opens a new channel. The caller owns it and must close it.
    async fn channel(&self) -> Result<Box<dyn AmqpChannel>, AmqpError>;

    fn config(&self) -> QueueConfig;
}

/// lapin implementation of [`QueueService`].
pub struct AmqpService {
    conn: Arc<Connection>,
    config: QueueConfig,
}

impl AmqpService {
    /// Creates a new service for the given queue configuration.
    ///
    /// # Parameters
    /// * `conn` - An open connection to the broker
    /// * `config` - The queue, exchange, consume and publish configuration
    ///
    /// # Returns
    /// An Arc-wrapped AmqpService, ready to be handed to the bootstrapper
    pub fn new(conn: Arc<Connection>, config: QueueConfig) -> Arc<AmqpService> {
        Arc::new(AmqpService { conn, config })
    }

    async fn open_channel(&self) -> Result<lapin::Channel, AmqpError> {
        debug!("creating amqp channel...");
        match self.conn.create_channel().await {
            Ok(c) => {
                debug!("channel created");
                Ok(c)
            }
            Err(err) => {
                error!(error = err.to_string(), "error to create the channel");
                Err(AmqpError::ChannelError)
            }
        }
    }

    /// Publishes an envelope to the configured exchange, using the queue name
    /// as routing key.
    ///
    /// The OpenTelemetry context is injected into the headers and a message
    /// id is assigned when the envelope does not carry one yet.
    ///
    /// # Parameters
    /// * `ctx` - OpenTelemetry context for tracing
    /// * `envelope` - The message to publish
    ///
    /// # Returns
    /// Ok(()) on success or AmqpError on failure
    pub async fn send(&self, ctx: &Context, mut envelope: Envelope) -> Result<(), AmqpError> {
        otel::inject_context(ctx, &mut envelope);

        if envelope.properties.message_id().is_none() {
            envelope.properties = envelope
                .properties
                .with_message_id(ShortString::from(Uuid::new_v4().to_string()));
        }

        let channel = self.open_channel().await?;
        let result = envelope
            .publish(
                &channel,
                &self.config.exchange.name,
                &self.config.queue_name,
                self.config.publish_options(),
            )
            .await;
        let closed = AmqpChannel::close(&channel).await;

        result.and(closed)
    }

    /// Registers a consumer on the configured queue.
    ///
    /// The returned consumer keeps its channel open for as long as it is
    /// being polled.
    pub async fn consume(&self) -> Result<Consumer, AmqpError> {
        let channel = self.open_channel().await?;

        AmqpChannel::basic_consume(
            &channel,
            &self.config.queue_name,
            &self.config.consume.consumer,
            self.config.consume_options(),
            FieldTable::default(),
        )
        .await
    }
}

#[async_trait]
impl QueueService for AmqpService {
    async fn create_queue(&self) -> Result<(), AmqpError> {
        let channel = self.open_channel().await?;

        let result = AmqpChannel::queue_declare(
            &channel,
            &self.config.queue_name,
            self.config.queue_declare_options(),
            FieldTable::default(),
        )
        .await;
        let closed = AmqpChannel::close(&channel).await;

        result.and(closed)
    }

    async fn create_exchange(&self) -> Result<(), AmqpError> {
        declare_exchange(&self.config, || self.open_channel()).await
    }

    async fn channel(&self) -> Result<Box<dyn AmqpChannel>, AmqpError> {
        let channel = self.open_channel().await?;
        Ok(Box::new(channel))
    }

    fn config(&self) -> QueueConfig {
        self.config.clone()
    }
}

// Declares the exchange of `config` on a channel obtained from `open`, then
// closes it. The default exchange cannot be declared, so no channel is opened
// for it and the call succeeds.
async fn declare_exchange<C, F, Fut>(config: &QueueConfig, open: F) -> Result<(), AmqpError>
where
    C: AmqpChannel,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, AmqpError>>,
{
    if config.exchange.is_default() {
        debug!(
            queue = config.queue_name.as_str(),
            "default exchange, nothing to declare"
        );
        return Ok(());
    }

    let channel = open().await?;

    let result = channel
        .exchange_declare(
            &config.exchange.name,
            lapin::ExchangeKind::from(&config.exchange.kind),
            config.exchange_declare_options(),
            FieldTable::default(),
        )
        .await;
    let closed = channel.close().await;

    result.and(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel::MockAmqpChannel, exchange::ExchangeConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_default_exchange_is_not_declared() {
        let opened = AtomicUsize::new(0);

        let result = declare_exchange(&QueueConfig::new("orders"), || {
            opened.fetch_add(1, Ordering::SeqCst);
            async { Ok(MockAmqpChannel::new()) }
        })
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_named_exchange_is_declared_then_closed() {
        let config =
            QueueConfig::new("orders").exchange(ExchangeConfig::new("events").fanout().durable());

        let mut channel = MockAmqpChannel::new();
        channel
            .expect_exchange_declare()
            .withf(|name, kind, options, _| {
                name == "events"
                    && matches!(kind, lapin::ExchangeKind::Fanout)
                    && options.durable
                    && !options.passive
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        channel.expect_close().times(1).returning(|| Ok(()));

        let result = declare_exchange(&config, || async { Ok(channel) }).await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_failed_exchange_declaration_still_closes_channel() {
        let config = QueueConfig::new("orders").exchange(ExchangeConfig::new("events"));

        let mut channel = MockAmqpChannel::new();
        channel
            .expect_exchange_declare()
            .times(1)
            .returning(|name, _, _, _| Err(AmqpError::DeclareExchangeError(name.to_owned())));
        channel.expect_close().times(1).returning(|| Ok(()));

        let result = declare_exchange(&config, || async { Ok(channel) }).await;

        assert_eq!(
            result,
            Err(AmqpError::DeclareExchangeError("events".to_string()))
        );
    }

    #[tokio::test]
    async fn test_exchange_channel_failure_is_reported() {
        let config = QueueConfig::new("orders").exchange(ExchangeConfig::new("events"));

        let result = declare_exchange(&config, || async {
            Err::<MockAmqpChannel, _>(AmqpError::ChannelError)
        })
        .await;

        assert_eq!(result, Err(AmqpError::ChannelError));
    }
}
