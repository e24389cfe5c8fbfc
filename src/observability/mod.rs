// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Instrumentation event stream emitted by the default middleware bundle.
//!
//! This is the sole contract the core exposes to downstream recording and
//! querying systems: `process` on entry, then exactly one of `resolution`,
//! `rejection`, or `cancellation` on exit. Storage backends and query layers
//! over this stream are external collaborators.

mod events;
mod sink;

pub use events::{Event, ProcessRecord, SpecRecord};
pub use sink::{EventSink, LogSink, MemorySink};
