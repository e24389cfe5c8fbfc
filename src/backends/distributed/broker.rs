// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::BrokerError;

/// One delivered stream entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

impl StreamEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, payload)| payload.as_str())
    }
}

/// Where a consumer-group read starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadPosition {
    /// This consumer's own delivered-but-unacknowledged entries after the
    /// given id (`"0"` for all of them). Never blocks.
    Backlog(String),
    /// Entries never delivered to any consumer in the group. Blocks up to the
    /// read's timeout.
    New,
}

/// Broker offering append-only streams, consumer groups, blocking pops, and
/// simple keyed queues.
///
/// The null-versus-empty distinction is load-bearing: `read_group` and
/// `pop_first` return `Ok(None)` for a blocking timeout (retry, not an
/// error), while `read_group` returning `Ok(Some(vec![]))` is a definite
/// empty batch (during backlog draining it means the backlog is exhausted).
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append an entry to a stream; returns the entry id.
    async fn append(&self, stream: &str, field: &str, payload: &str)
        -> Result<String, BrokerError>;

    /// Create a consumer group positioned at the tail of the stream. Fails
    /// with [`BrokerError::GroupAlreadyExists`] when the group exists; the
    /// protocol layer treats that as success.
    async fn create_group(&self, stream: &str, group: &str) -> Result<(), BrokerError>;

    /// Read a bounded batch as a named consumer in a group.
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        position: ReadPosition,
        count: usize,
        block: Duration,
    ) -> Result<Option<Vec<StreamEntry>>, BrokerError>;

    /// Acknowledge a delivered entry.
    async fn ack(&self, stream: &str, group: &str, entry_id: &str) -> Result<(), BrokerError>;

    /// Push a payload onto a keyed list.
    async fn push(&self, key: &str, payload: &str) -> Result<(), BrokerError>;

    /// Blocking pop across several keys at once; the first non-empty key (in
    /// the order given) is authoritative. The dispatch protocol relies on at
    /// most one of the polled keys ever being populated per process; that
    /// mutual exclusion is a protocol invariant, not enforced here.
    async fn pop_first(
        &self,
        keys: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, BrokerError>;

    /// Release broker resources. Further operations may fail with
    /// [`BrokerError::Disconnected`].
    async fn disconnect(&self) -> Result<(), BrokerError>;
}
