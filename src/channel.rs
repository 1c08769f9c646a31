// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Capability
//!
//! `AmqpChannel` is the subset of broker channel operations this crate needs:
//! declaring and binding topology, publishing, consuming, and channel
//! transactions. It is implemented for `lapin::Channel`; tests substitute a
//! mock or an in-memory fake.

use crate::{envelope::Envelope, errors::AmqpError};
use async_trait::async_trait;
use lapin::{
    options::{
        BasicConsumeOptions, BasicPublishOptions, ExchangeBindOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Consumer, ExchangeKind,
};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, error};

const REPLY_SUCCESS: u16 = 200;

/// Broker channel operations used by the topology bootstrapper and the
/// envelope helpers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AmqpChannel: Send + Sync {
    /// Closes the channel. Called once the owner is done with it.
    async fn close(&self) -> Result<(), AmqpError>;

    async fn queue_declare(
        &self,
        name: &str,
        options: QueueDeclareOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError>;

    async fn exchange_declare(
        &self,
        name: &str,
        kind: ExchangeKind,
        options: ExchangeDeclareOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError>;

    /// Binds `queue` to `exchange` under `routing_key`.
    async fn queue_bind(
        &self,
        queue: &str,
        routing_key: &str,
        exchange: &str,
        options: QueueBindOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError>;

    /// Binds the `destination` exchange to the `source` exchange under `routing_key`.
    async fn exchange_bind(
        &self,
        destination: &str,
        routing_key: &str,
        source: &str,
        options: ExchangeBindOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError>;

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        envelope: &Envelope,
    ) -> Result<(), AmqpError>;

    async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
        args: FieldTable,
    ) -> Result<Consumer, AmqpError>;

    /// Puts the channel in transactional mode.
    async fn tx(&self) -> Result<(), AmqpError>;

    async fn tx_commit(&self) -> Result<(), AmqpError>;

    async fn tx_rollback(&self) -> Result<(), AmqpError>;
}

#[async_trait]
impl AmqpChannel for Channel {
    async fn close(&self) -> Result<(), AmqpError> {
        match Channel::close(self, REPLY_SUCCESS, "OK").await {
            Err(err) => {
                error!(error = err.to_string(), "error to close the channel");
                Err(AmqpError::ChannelCloseError)
            }
            _ => {
                debug!("channel closed");
                Ok(())
            }
        }
    }

    async fn queue_declare(
        &self,
        name: &str,
        options: QueueDeclareOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError> {
        debug!("creating queue: {}", name);

        match Channel::queue_declare(self, name, options, args).await {
            Err(err) => {
                error!(error = err.to_string(), name, "error to declare the queue");
                Err(AmqpError::DeclareQueueError(name.to_owned()))
            }
            _ => {
                debug!("queue: {} was created", name);
                Ok(())
            }
        }
    }

    async fn exchange_declare(
        &self,
        name: &str,
        kind: ExchangeKind,
        options: ExchangeDeclareOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError> {
        debug!("creating exchange: {}", name);

        match Channel::exchange_declare(self, name, kind, options, args).await {
            Err(err) => {
                error!(error = err.to_string(), name, "error to declare the exchange");
                Err(AmqpError::DeclareExchangeError(name.to_owned()))
            }
            _ => {
                debug!("exchange: {} was created", name);
                Ok(())
            }
        }
    }

    async fn queue_bind(
        &self,
        queue: &str,
        routing_key: &str,
        exchange: &str,
        options: QueueBindOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError> {
        debug!(
            "binding queue: {} to the exchange: {} with the key: {}",
            queue, exchange, routing_key
        );

        match Channel::queue_bind(self, queue, exchange, routing_key, options, args).await {
            Err(err) => {
                error!(error = err.to_string(), "error to bind queue to exchange");
                Err(AmqpError::BindingExchangeToQueueError(
                    exchange.to_owned(),
                    queue.to_owned(),
                ))
            }
            _ => Ok(()),
        }
    }

    async fn exchange_bind(
        &self,
        destination: &str,
        routing_key: &str,
        source: &str,
        options: ExchangeBindOptions,
        args: FieldTable,
    ) -> Result<(), AmqpError> {
        match Channel::exchange_bind(self, destination, source, routing_key, options, args).await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to bind exchange to exchange");
                Err(AmqpError::BindingExchangeToExchangeError(
                    source.to_owned(),
                    destination.to_owned(),
                ))
            }
            _ => Ok(()),
        }
    }

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        envelope: &Envelope,
    ) -> Result<(), AmqpError> {
        match Channel::basic_publish(
            self,
            exchange,
            routing_key,
            options,
            &envelope.body,
            envelope.properties.clone(),
        )
        .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(AmqpError::PublishingError)
            }
            _ => Ok(()),
        }
    }

    async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
        args: FieldTable,
    ) -> Result<Consumer, AmqpError> {
        match Channel::basic_consume(self, queue, consumer_tag, options, args).await {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(AmqpError::ConsumerDeclarationError)
            }
            Ok(c) => Ok(c),
        }
    }

    async fn tx(&self) -> Result<(), AmqpError> {
        Channel::tx_select(self).await.map_err(|err| {
            error!(error = err.to_string(), "error to select transaction mode");
            AmqpError::TransactionError("select".to_owned())
        })
    }

    async fn tx_commit(&self) -> Result<(), AmqpError> {
        Channel::tx_commit(self).await.map_err(|err| {
            error!(error = err.to_string(), "error to commit transaction");
            AmqpError::TransactionError("commit".to_owned())
        })
    }

    async fn tx_rollback(&self) -> Result<(), AmqpError> {
        Channel::tx_rollback(self).await.map_err(|err| {
            error!(error = err.to_string(), "error to rollback transaction");
            AmqpError::TransactionError("rollback".to_owned())
        })
    }
}
