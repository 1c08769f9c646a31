// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

pub mod channel;
pub mod envelope;
pub mod errors;
pub mod exchange;
pub mod message;
pub mod otel;
pub mod queue;
pub mod service;
pub mod topology;
