// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Envelope
//!
//! An `Envelope` is the publishable unit handed to the broker: lapin's
//! `BasicProperties` (headers and metadata) plus the body bytes.
//!
//! Retry accounting lives in the reserved [`RETRY_COUNT_HEADER`] entry of the
//! header table, stored as a 64-bit signed integer.

use crate::{channel::AmqpChannel, errors::AmqpError};
use lapin::{
    message::Delivery,
    options::BasicPublishOptions,
    types::{AMQPValue, FieldTable, LongLongInt, ShortString},
    BasicProperties,
};

/// Header holding the number of times a message was kicked back
pub const RETRY_COUNT_HEADER: &str = "retryCount";

/// Read access to a message received from, or destined to, the broker.
pub trait InboundMessage {
    fn properties(&self) -> &BasicProperties;
    fn body(&self) -> &[u8];
}

impl InboundMessage for Delivery {
    fn properties(&self) -> &BasicProperties {
        &self.properties
    }

    fn body(&self) -> &[u8] {
        &self.data
    }
}

/// A message ready to be published.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub properties: BasicProperties,
    pub body: Vec<u8>,
}

impl InboundMessage for Envelope {
    fn properties(&self) -> &BasicProperties {
        &self.properties
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Envelope {
    pub fn new(properties: BasicProperties, body: Vec<u8>) -> Self {
        Envelope { properties, body }
    }

    /// Returns the header table, if the envelope carries one.
    pub fn headers(&self) -> Option<&FieldTable> {
        self.properties.headers().as_ref()
    }

    /// Returns the retry count, treating a missing header as zero.
    ///
    /// Fails with `InvalidRetryHeader` when the header is not an integer.
    pub fn retry_count(&self) -> Result<i64, AmqpError> {
        match self.headers() {
            Some(headers) => Ok(retry_count(headers)?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Publishes the envelope through the given channel.
    ///
    /// # Parameters
    /// * `channel` - The channel used to reach the broker
    /// * `exchange` - Destination exchange, empty for the default exchange
    /// * `routing_key` - Routing key of the message
    /// * `options` - Mandatory/immediate publishing flags
    pub async fn publish(
        &self,
        channel: &dyn AmqpChannel,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
    ) -> Result<(), AmqpError> {
        channel
            .basic_publish(exchange, routing_key, options, self)
            .await
    }
}

/// Reads the retry count stored in a header table.
///
/// Returns `Ok(None)` when the header is absent. Any integer-shaped value is
/// widened to `i64`; other value types are rejected rather than coerced.
pub fn retry_count(headers: &FieldTable) -> Result<Option<i64>, AmqpError> {
    let Some(value) = headers.inner().get(RETRY_COUNT_HEADER) else {
        return Ok(None);
    };

    let count = match value {
        AMQPValue::LongLongInt(v) => *v,
        AMQPValue::LongInt(v) => i64::from(*v),
        AMQPValue::LongUInt(v) => i64::from(*v),
        AMQPValue::ShortInt(v) => i64::from(*v),
        AMQPValue::ShortUInt(v) => i64::from(*v),
        AMQPValue::ShortShortInt(v) => i64::from(*v),
        AMQPValue::ShortShortUInt(v) => i64::from(*v),
        other => return Err(AmqpError::InvalidRetryHeader(format!("{:?}", other))),
    };

    Ok(Some(count))
}

/// Overwrites the retry count stored in a header table.
pub fn set_retry_count(headers: &mut FieldTable, count: i64) {
    headers.insert(
        ShortString::from(RETRY_COUNT_HEADER),
        AMQPValue::LongLongInt(LongLongInt::from(count)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockAmqpChannel;
    use lapin::types::LongString;

    fn headers_with(value: AMQPValue) -> FieldTable {
        let mut headers = FieldTable::default();
        headers.insert(ShortString::from(RETRY_COUNT_HEADER), value);
        headers
    }

    #[test]
    fn missing_header_reads_as_none() {
        assert_eq!(retry_count(&FieldTable::default()), Ok(None));
        assert_eq!(Envelope::default().retry_count(), Ok(0));
    }

    #[test]
    fn integer_shaped_values_are_widened() {
        assert_eq!(
            retry_count(&headers_with(AMQPValue::LongLongInt(7))),
            Ok(Some(7))
        );
        assert_eq!(
            retry_count(&headers_with(AMQPValue::LongInt(3))),
            Ok(Some(3))
        );
        assert_eq!(
            retry_count(&headers_with(AMQPValue::ShortShortUInt(2))),
            Ok(Some(2))
        );
    }

    #[test]
    fn non_integer_values_are_rejected() {
        let headers = headers_with(AMQPValue::LongString(LongString::from("3")));
        assert!(matches!(
            retry_count(&headers),
            Err(AmqpError::InvalidRetryHeader(_))
        ));

        let headers = headers_with(AMQPValue::Boolean(true));
        assert!(matches!(
            retry_count(&headers),
            Err(AmqpError::InvalidRetryHeader(_))
        ));
    }

    #[test]
    fn set_retry_count_overwrites() {
        let mut headers = headers_with(AMQPValue::LongString(LongString::from("x")));
        set_retry_count(&mut headers, 4);
        assert_eq!(retry_count(&headers), Ok(Some(4)));
    }

    #[tokio::test]
    async fn publish_hands_envelope_to_channel() {
        let mut channel = MockAmqpChannel::new();
        channel
            .expect_basic_publish()
            .withf(|exchange, key, options, envelope| {
                exchange == "orders"
                    && key == "orders.created"
                    && options.mandatory
                    && envelope.body == b"{}".to_vec()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let envelope = Envelope::new(BasicProperties::default(), b"{}".to_vec());
        let result = envelope
            .publish(
                &channel,
                "orders",
                "orders.created",
                BasicPublishOptions {
                    mandatory: true,
                    immediate: false,
                },
            )
            .await;

        assert_eq!(result, Ok(()));
    }
}
