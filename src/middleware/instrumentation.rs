// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use crate::connector::Outcome;
use crate::middleware::Bundle;
use crate::observability::{Event, EventSink};
use crate::task::Process;

/// Default instrumentation bundle: emits a `process` event on entry and
/// exactly one of `resolution`, `rejection`, or `cancellation` on exit.
pub fn instrumentation(sink: Arc<dyn EventSink>) -> Arc<dyn Bundle> {
    Arc::new(Instrumentation { sink })
}

struct Instrumentation {
    sink: Arc<dyn EventSink>,
}

#[async_trait]
impl Bundle for Instrumentation {
    async fn pre(&self, process: Process) -> Process {
        self.sink.emit(Event::process(&process));
        process
    }

    async fn post(&self, outcome: Outcome, process: &Process) -> Outcome {
        let event = match &outcome {
            Outcome::Resolved(value) => Event::resolution(process.id(), value.clone()),
            Outcome::Rejected(error) => Event::rejection(process.id(), error.to_reason()),
            Outcome::Cancelled => Event::cancellation(process.id()),
        };
        self.sink.emit(event);
        outcome
    }
}
