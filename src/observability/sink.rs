// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Mutex;

use crate::observability::Event;

/// Consumer of the instrumentation event stream.
///
/// Emission is synchronous and must not block: sinks that persist events are
/// expected to hand off internally.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink that writes events to the `tracing` subscriber as structured logs.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(kind = event.kind(), event = %payload, "instrumentation event"),
            Err(error) => tracing::warn!(kind = event.kind(), %error, "unserializable instrumentation event"),
        }
    }
}

/// In-memory sink capturing events for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
