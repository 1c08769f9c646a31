// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Bootstrap
//!
//! This module realizes the queues, exchanges and bindings of a batch of
//! [`QueueService`]s on the broker, and validates that the batch is coherent
//! before doing so.
//!
//! Bootstrap is best effort: topology setup runs on every process start, so a
//! declaration that fails because the object already exists (or for any other
//! reason) is logged and skipped, never aborting the rest of the batch.
//!
//! The main entry points are:
//! - `assert_unique_queues`: fatal check that queue names are distinct
//! - `create_topologies`: declares every queue and exchange concurrently
//! - `bind_topologies`: binds every queue to its exchange concurrently
//! - `bootstrap`: creation followed by binding

use crate::{channel::AmqpChannel, errors::AmqpError, queue::QueueConfig, service::QueueService};
use futures_util::future::join_all;
use lapin::{options::QueueBindOptions, types::FieldTable};
use std::{collections::HashSet, future::Future, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Checks that every configuration names a distinct queue.
///
/// The scan stops at the first duplicate, which is reported as
/// `DuplicateQueueName`.
pub fn check_unique_queues(configs: &[QueueConfig]) -> Result<(), AmqpError> {
    let mut queues = HashSet::new();

    for (i, config) in configs.iter().enumerate() {
        queues.insert(config.queue_name.as_str());
        if queues.len() != i + 1 {
            return Err(AmqpError::DuplicateQueueName(config.queue_name.clone()));
        }
    }

    Ok(())
}

/// Ensures that the configurations consist of unique queues.
///
/// # Panics
/// When two configurations share a queue name. Every configuration is logged
/// with its index first, to ease the diagnosis of the deployment.
pub fn assert_unique_queues(configs: &[QueueConfig]) {
    if let Err(err) = check_unique_queues(configs) {
        for (i, config) in configs.iter().enumerate() {
            error!("{} = {}", i, config.queue_name);
        }
        error!(error = err.to_string(), "invalid queue configuration");
        panic!("queue names are not unique");
    }
}

/// Declares the topology of every service, then binds it.
///
/// Binding only starts once every declaration has completed, since a binding
/// may target an exchange declared in the first phase.
pub async fn bootstrap(services: &[Arc<dyn QueueService>]) {
    create_topologies(services).await;
    bind_topologies(services).await;
}

/// Attempts to create the queue and the exchange of every service.
///
/// Both declarations of every service run concurrently. Failures are logged
/// and otherwise ignored; the call returns once all of them completed.
pub async fn create_topologies(services: &[Arc<dyn QueueService>]) {
    let mut spawns = Vec::with_capacity(services.len() * 2);

    for service in services {
        let queue = service.clone();
        spawns.push(tokio::spawn(async move { queue.create_queue().await }));

        let exchange = service.clone();
        spawns.push(tokio::spawn(async move { exchange.create_exchange().await }));
    }

    drain("failed to create a queue or exchange", spawns).await;
}

/// Binds the queue of every service to its exchange, with the queue name as
/// routing key.
///
/// Services using the default exchange are skipped without error. Each
/// attempt runs on its own channel, closed before the attempt completes.
pub async fn bind_topologies(services: &[Arc<dyn QueueService>]) {
    let spawns = services
        .iter()
        .map(|service| tokio::spawn(bind_queue(service.clone())))
        .collect::<Vec<_>>();

    drain("failed to bind a queue to its exchange", spawns).await;
}

async fn bind_queue(service: Arc<dyn QueueService>) -> Result<(), AmqpError> {
    let channel = service.channel().await?;

    with_channel(channel, |channel| async move {
        let config = service.config();
        if config.exchange.is_default() {
            debug!(
                queue = config.queue_name.as_str(),
                "default exchange, skipping binding"
            );
            return Ok(());
        }

        channel
            .queue_bind(
                &config.queue_name,
                &config.queue_name,
                &config.exchange.name,
                QueueBindOptions { nowait: false },
                FieldTable::default(),
            )
            .await
    })
    .await
}

// Runs `op` and closes the channel whatever its outcome. The error of `op`
// takes precedence over a close failure.
async fn with_channel<F, Fut>(channel: Box<dyn AmqpChannel>, op: F) -> Result<(), AmqpError>
where
    F: FnOnce(Arc<dyn AmqpChannel>) -> Fut,
    Fut: Future<Output = Result<(), AmqpError>>,
{
    let channel: Arc<dyn AmqpChannel> = Arc::from(channel);

    let result = op(channel.clone()).await;
    let closed = channel.close().await;

    result.and(closed)
}

async fn drain(msg: &str, spawns: Vec<JoinHandle<Result<(), AmqpError>>>) {
    for res in join_all(spawns).await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = err.to_string(), "{}", msg),
            Err(err) => error!(error = err.to_string(), "topology task did not complete"),
        }
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
