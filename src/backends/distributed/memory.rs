// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process broker with the same stream/group/list semantics as the Redis
//! implementation.
//!
//! Used by the protocol integration tests and for single-process deployments
//! that want the distributed code path without a broker. Blocking reads are
//! implemented with a shared [`Notify`] woken by every append and push.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::backends::distributed::{Broker, ReadPosition, StreamEntry};
use crate::errors::BrokerError;

#[derive(Default)]
struct StoredEntry {
    seq: u64,
    fields: Vec<(String, String)>,
}

#[derive(Default)]
struct GroupState {
    /// Index into the entry log of the next never-delivered entry.
    next_index: usize,
    /// Per-consumer delivered-but-unacknowledged entries, ordered by
    /// sequence.
    pending: HashMap<String, BTreeMap<u64, usize>>,
}

#[derive(Default)]
struct StreamState {
    entries: Vec<StoredEntry>,
    groups: HashMap<String, GroupState>,
}

#[derive(Default)]
struct BrokerState {
    sequence: u64,
    streams: HashMap<String, StreamState>,
    lists: HashMap<String, VecDeque<String>>,
    disconnected: bool,
}

/// In-memory [`Broker`] implementation.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    wakeup: Arc<Notify>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_id(seq: u64) -> String {
        format!("{seq}-0")
    }

    fn parse_seq(entry_id: &str) -> Option<u64> {
        entry_id.split('-').next()?.parse().ok()
    }
}

fn ensure_connected(state: &BrokerState) -> Result<(), BrokerError> {
    if state.disconnected {
        Err(BrokerError::Disconnected)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn append(
        &self,
        stream: &str,
        field: &str,
        payload: &str,
    ) -> Result<String, BrokerError> {
        let mut state = self.state.lock().await;
        ensure_connected(&state)?;
        state.sequence += 1;
        let seq = state.sequence;
        let entry = StoredEntry {
            seq,
            fields: vec![(field.to_string(), payload.to_string())],
        };
        state
            .streams
            .entry(stream.to_string())
            .or_default()
            .entries
            .push(entry);
        drop(state);
        self.wakeup.notify_waiters();
        Ok(Self::entry_id(seq))
    }

    async fn create_group(&self, stream: &str, group: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        ensure_connected(&state)?;
        let stream_state = state.streams.entry(stream.to_string()).or_default();
        if stream_state.groups.contains_key(group) {
            return Err(BrokerError::GroupAlreadyExists {
                stream: stream.to_string(),
            });
        }
        // New groups are positioned at the tail of the stream.
        let tail = stream_state.entries.len();
        stream_state.groups.insert(
            group.to_string(),
            GroupState {
                next_index: tail,
                pending: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        position: ReadPosition,
        count: usize,
        block: Duration,
    ) -> Result<Option<Vec<StreamEntry>>, BrokerError> {
        let deadline = Instant::now() + block;
        loop {
            let wakeup = self.wakeup.notified();
            {
                let mut state = self.state.lock().await;
                ensure_connected(&state)?;
                let stream_state = state.streams.entry(stream.to_string()).or_default();
                let Some(group_state) = stream_state.groups.get_mut(group) else {
                    return Err(BrokerError::Command {
                        message: format!("no such consumer group '{group}' for stream '{stream}'"),
                    });
                };

                match &position {
                    ReadPosition::Backlog(after) => {
                        // Backlog reads never block: return this consumer's
                        // pending entries after the cursor, possibly empty.
                        let after_seq = Self::parse_seq(after).unwrap_or(0);
                        let indexes: Vec<usize> = group_state
                            .pending
                            .get(consumer)
                            .map(|pending| {
                                pending
                                    .range((after_seq + 1)..)
                                    .take(count)
                                    .map(|(_, index)| *index)
                                    .collect()
                            })
                            .unwrap_or_default();
                        let batch = indexes
                            .into_iter()
                            .map(|index| {
                                let entry = &stream_state.entries[index];
                                StreamEntry {
                                    id: Self::entry_id(entry.seq),
                                    fields: entry.fields.clone(),
                                }
                            })
                            .collect();
                        return Ok(Some(batch));
                    }
                    ReadPosition::New => {
                        let start = group_state.next_index;
                        let end = (start + count).min(stream_state.entries.len());
                        if end > start {
                            let mut batch = Vec::with_capacity(end - start);
                            let mut delivered = Vec::with_capacity(end - start);
                            for index in start..end {
                                let entry = &stream_state.entries[index];
                                delivered.push((entry.seq, index));
                                batch.push(StreamEntry {
                                    id: Self::entry_id(entry.seq),
                                    fields: entry.fields.clone(),
                                });
                            }
                            let group_state = stream_state
                                .groups
                                .get_mut(group)
                                .expect("group checked above");
                            let pending = group_state
                                .pending
                                .entry(consumer.to_string())
                                .or_default();
                            for (seq, index) in delivered {
                                pending.insert(seq, index);
                            }
                            group_state.next_index = end;
                            return Ok(Some(batch));
                        }
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            if tokio::time::timeout(remaining, wakeup).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ack(&self, stream: &str, group: &str, entry_id: &str) -> Result<(), BrokerError> {
        let Some(seq) = Self::parse_seq(entry_id) else {
            return Err(BrokerError::Command {
                message: format!("malformed entry id '{entry_id}'"),
            });
        };
        let mut state = self.state.lock().await;
        ensure_connected(&state)?;
        if let Some(stream_state) = state.streams.get_mut(stream) {
            if let Some(group_state) = stream_state.groups.get_mut(group) {
                for pending in group_state.pending.values_mut() {
                    pending.remove(&seq);
                }
            }
        }
        Ok(())
    }

    async fn push(&self, key: &str, payload: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        ensure_connected(&state)?;
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(payload.to_string());
        drop(state);
        self.wakeup.notify_waiters();
        Ok(())
    }

    async fn pop_first(
        &self,
        keys: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            let wakeup = self.wakeup.notified();
            {
                let mut state = self.state.lock().await;
                ensure_connected(&state)?;
                for key in keys {
                    if let Some(list) = state.lists.get_mut(key) {
                        if let Some(payload) = list.pop_front() {
                            return Ok(Some((key.clone(), payload)));
                        }
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            if tokio::time::timeout(remaining, wakeup).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.disconnected = true;
        drop(state);
        self.wakeup.notify_waiters();
        Ok(())
    }
}
