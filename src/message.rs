// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Envelope Factory
//!
//! Pure functions building the envelopes an application publishes:
//!
//! - [`create_message`]: a brand new message with a zero retry count
//! - [`get_next_message`]: a new body forwarded on behalf of a received message,
//!   keeping its headers and content metadata and resetting the retry count
//! - [`get_kickback_message`]: the received message itself, requeued with its
//!   retry count incremented, as long as the retry budget allows it
//!
//! The retry budget check compares the count *before* incrementing it against
//! `max_retries`, so a message can be kicked back `max_retries + 1` times
//! before being rejected. Consumers rely on that bound.

use crate::{
    envelope::{retry_count, set_retry_count, Envelope, InboundMessage},
    errors::AmqpError,
};
use lapin::{types::FieldTable, BasicProperties};
use serde::Serialize;
use tracing::{debug, warn};

/// Factory bound to a fixed retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmqpMessage {
    max_retries: i64,
}

impl AmqpMessage {
    pub fn new(max_retries: i64) -> Self {
        AmqpMessage { max_retries }
    }

    pub fn max_retries(&self) -> i64 {
        self.max_retries
    }

    /// See [`create_message`].
    pub fn create_message<T: Serialize + ?Sized>(&self, body: &T) -> Result<Envelope, AmqpError> {
        create_message(body)
    }

    /// See [`get_next_message`].
    pub fn get_next_message<M, T>(&self, source: &M, body: &T) -> Result<Envelope, AmqpError>
    where
        M: InboundMessage + ?Sized,
        T: Serialize + ?Sized,
    {
        get_next_message(source, body)
    }

    /// Builds the requeue envelope of `source` using the bound retry budget.
    /// See [`get_kickback_message`].
    pub fn get_kickback_message<M: InboundMessage + ?Sized>(
        &self,
        source: &M,
    ) -> Result<Envelope, AmqpError> {
        get_kickback_message(self.max_retries, source)
    }
}

/// Creates a message from the given body.
///
/// The body is encoded as JSON. The only header set is the retry count,
/// initialised to zero; no other metadata is populated.
pub fn create_message<T: Serialize + ?Sized>(body: &T) -> Result<Envelope, AmqpError> {
    let raw = serialize(body)?;

    let mut headers = FieldTable::default();
    set_retry_count(&mut headers, 0);

    Ok(Envelope::new(
        BasicProperties::default().with_headers(headers),
        raw,
    ))
}

/// Creates a message carrying a new body on behalf of `source`.
///
/// Headers, content type, content encoding, delivery mode and type are taken
/// from `source`. Replacing the body always resets the retry count to zero.
pub fn get_next_message<M, T>(source: &M, body: &T) -> Result<Envelope, AmqpError>
where
    M: InboundMessage + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serialize(body)?;
    let src = source.properties();

    let mut headers = src.headers().clone().unwrap_or_default();
    set_retry_count(&mut headers, 0);

    let mut props = BasicProperties::default().with_headers(headers);
    props = carry(props, src.content_type(), BasicProperties::with_content_type);
    props = carry(
        props,
        src.content_encoding(),
        BasicProperties::with_content_encoding,
    );
    props = carry(props, src.delivery_mode(), BasicProperties::with_delivery_mode);
    props = carry(props, src.kind(), BasicProperties::with_kind);

    Ok(Envelope::new(props, raw))
}

/// Creates the requeue message of `source` for a non-fatal processing error.
///
/// Headers, metadata and the original body bytes are carried over unchanged,
/// and the retry count is incremented. A missing retry header counts as zero.
///
/// # Errors
/// * `RetryExhausted` when the current retry count is greater than `max_retries`
/// * `InvalidRetryHeader` when the retry header does not hold an integer
pub fn get_kickback_message<M: InboundMessage + ?Sized>(
    max_retries: i64,
    source: &M,
) -> Result<Envelope, AmqpError> {
    let src = source.properties();

    let mut headers = src.headers().clone().unwrap_or_default();
    let count = retry_count(&headers)?.unwrap_or(0);

    if count > max_retries {
        warn!(count, max_retries, "too many retries");
        return Err(AmqpError::RetryExhausted { count, max_retries });
    }

    let next = count.saturating_add(1);
    set_retry_count(&mut headers, next);
    debug!(retry = next, max_retries, "kicking back message");

    let mut props = BasicProperties::default().with_headers(headers);
    props = carry(props, src.content_type(), BasicProperties::with_content_type);
    props = carry(
        props,
        src.content_encoding(),
        BasicProperties::with_content_encoding,
    );
    props = carry(props, src.delivery_mode(), BasicProperties::with_delivery_mode);
    props = carry(props, src.priority(), BasicProperties::with_priority);
    props = carry(
        props,
        src.correlation_id(),
        BasicProperties::with_correlation_id,
    );
    props = carry(props, src.reply_to(), BasicProperties::with_reply_to);
    props = carry(props, src.expiration(), BasicProperties::with_expiration);
    props = carry(props, src.message_id(), BasicProperties::with_message_id);
    props = carry(props, src.timestamp(), BasicProperties::with_timestamp);
    props = carry(props, src.kind(), BasicProperties::with_kind);

    Ok(Envelope::new(props, source.body().to_vec()))
}

fn serialize<T: Serialize + ?Sized>(body: &T) -> Result<Vec<u8>, AmqpError> {
    serde_json::to_vec(body).map_err(|err| {
        warn!(error = err.to_string(), "failure to serialize message body");
        AmqpError::SerializationError(err.to_string())
    })
}

// Copies one optional property when the source has it.
fn carry<T: Clone>(
    props: BasicProperties,
    value: &Option<T>,
    set: fn(BasicProperties, T) -> BasicProperties,
) -> BasicProperties {
    match value {
        Some(v) => set(props, v.clone()),
        None => props,
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
