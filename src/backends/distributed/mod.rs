// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Broker-based backend: cross-process dispatch, polling, acknowledgment,
//! and cancellation.
//!
//! Per task name there is one logical queue: a stream the dispatcher appends
//! encoded processes to and a consumer group competing providers read from.
//! Per process id there are three keyed lists: `{id}/resolved`,
//! `{id}/rejected`, and `{id}/cancelled`. All per-process state lives in
//! broker keys, never in local memory, which is what lets independent
//! processes dispatch and provide concurrently without coordination beyond
//! the broker.

mod broker;
mod codec;
mod memory;
mod pool;
mod protocol;
mod redis;


pub use broker::{Broker, ReadPosition, StreamEntry};
pub use memory::MemoryBroker;
pub use pool::{ConnectionFactory, ConnectionPool, PooledConnection};
pub use protocol::DistributedBackend;
pub use redis::RedisBroker;
