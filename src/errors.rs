// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! The `AmqpError` enum covers every failure this crate can report: broker
//! topology operations, channel handling, publishing, and the per-message
//! decisions taken by the envelope factory (serialization and retry budget).
//!
//! Topology failures are only ever logged by the bootstrapper; envelope
//! failures are returned to the caller.

use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmqpError {
    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error closing a channel
    #[error("failure to close the channel")]
    ChannelCloseError,

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to bind exchange `{0}` to queue `{1}`")]
    BindingExchangeToQueueError(String, String),

    /// Error binding an exchange to another exchange
    #[error("failure to bind exchange `{0}` to exchange `{1}`")]
    BindingExchangeToExchangeError(String, String),

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// Error declaring a consumer
    #[error("consumer declaration error")]
    ConsumerDeclarationError,

    /// Error selecting, committing or rolling back a channel transaction
    #[error("failure to run transaction command `{0}`")]
    TransactionError(String),

    /// Two configurations of the same bootstrap batch name the same queue
    #[error("queue `{0}` is declared more than once")]
    DuplicateQueueName(String),

    /// A message body could not be encoded
    #[error("failure to serialize message body: {0}")]
    SerializationError(String),

    /// The reserved retry header holds a value that is not an integer
    #[error("retry header holds a non integer value `{0}`")]
    InvalidRetryHeader(String),

    /// A kickback was requested after the retry budget was spent
    #[error("too many retries: {count} > {max_retries}")]
    RetryExhausted { count: i64, max_retries: i64 },
}
