// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Propagation Through Message Headers
//!
//! Trace context travels in the same header table as the retry count. The
//! propagator writes lowercase keys such as `traceparent`, so it never
//! collides with the reserved `retryCount` entry.

use crate::envelope::{Envelope, InboundMessage};
use lapin::types::{AMQPValue, FieldTable, ShortString};
use opentelemetry::{
    global::{self, BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, Tracer},
    Context,
};
use std::borrow::Cow;
use tracing::error;

/// Writes trace context entries into an AMQP header table.
pub(crate) struct HeaderInjector<'a> {
    headers: &'a mut FieldTable,
}

impl<'a> HeaderInjector<'a> {
    pub(crate) fn new(headers: &'a mut FieldTable) -> Self {
        Self { headers }
    }
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.headers.insert(
            ShortString::from(key.to_lowercase()),
            AMQPValue::LongString(value.into()),
        );
    }
}

/// Reads trace context entries from an AMQP header table.
pub(crate) struct HeaderExtractor<'a> {
    headers: &'a FieldTable,
}

impl<'a> HeaderExtractor<'a> {
    pub(crate) fn new(headers: &'a FieldTable) -> Self {
        Self { headers }
    }
}

impl Extractor for HeaderExtractor<'_> {
    /// Only long string values can carry trace context; anything else is skipped.
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.inner().get(key).and_then(|header_value| {
            if let AMQPValue::LongString(header_value) = header_value {
                std::str::from_utf8(header_value.as_bytes())
                    .map_err(|e| error!("Error decoding header value {:?}", e))
                    .ok()
            } else {
                None
            }
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.headers
            .inner()
            .keys()
            .map(|header| header.as_str())
            .collect()
    }
}

/// Injects the given context into the envelope headers using the globally
/// registered text map propagator.
pub fn inject_context(ctx: &Context, envelope: &mut Envelope) {
    let mut headers = envelope.headers().cloned().unwrap_or_default();

    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(ctx, &mut HeaderInjector::new(&mut headers))
    });

    envelope.properties = envelope.properties.clone().with_headers(headers);
}

/// Extracts the remote context carried by a message.
pub fn extract_context<M: InboundMessage + ?Sized>(msg: &M) -> Context {
    let headers = msg.properties().headers().clone().unwrap_or_default();

    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor::new(&headers)))
}

/// Creates a new consumer span for message processing.
///
/// This function extracts trace context from the message headers and
/// starts a span as a child of it.
///
/// # Parameters
/// * `msg` - The received message
/// * `tracer` - OpenTelemetry tracer
/// * `name` - Name for the new span (typically the message type)
///
/// # Returns
/// A tuple containing the extracted context and the new span
pub fn new_span<M: InboundMessage + ?Sized>(
    msg: &M,
    tracer: &BoxedTracer,
    name: &str,
) -> (Context, BoxedSpan) {
    let ctx = extract_context(msg);

    let span = tracer
        .span_builder(Cow::from(name.to_owned()))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RETRY_COUNT_HEADER;
    use lapin::types::LongString;

    #[test]
    fn injector_lowercases_keys() {
        let mut headers = FieldTable::default();
        HeaderInjector::new(&mut headers).set("TraceParent", "00-abc-def-01".to_owned());

        assert_eq!(
            headers.inner().get("traceparent"),
            Some(&AMQPValue::LongString(LongString::from("00-abc-def-01")))
        );
    }

    #[test]
    fn extractor_reads_long_strings_only() {
        let mut headers = FieldTable::default();
        headers.insert(
            ShortString::from("traceparent"),
            AMQPValue::LongString(LongString::from("00-abc-def-01")),
        );
        headers.insert(
            ShortString::from(RETRY_COUNT_HEADER),
            AMQPValue::LongLongInt(1),
        );

        let extractor = HeaderExtractor::new(&headers);
        assert_eq!(extractor.get("traceparent"), Some("00-abc-def-01"));
        assert_eq!(extractor.get(RETRY_COUNT_HEADER), None);
        assert_eq!(extractor.keys().len(), 2);
    }

    #[test]
    fn inject_keeps_existing_headers() {
        let mut envelope = crate::message::create_message(&"payload").unwrap();
        inject_context(&Context::new(), &mut envelope);

        assert_eq!(envelope.retry_count(), Ok(0));
    }
}
