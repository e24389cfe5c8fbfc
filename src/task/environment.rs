// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::connector::Outcome;
use crate::task::{ContextSnapshot, ContextValue, Process};
use crate::traits::ProcessRunner;

/// Ephemeral per-dispatch handle passed to a behavior.
///
/// Exposes the enclosing process's resolved context values and `run_child`,
/// which stamps the child process with this invocation's id as parent and the
/// enclosing context before re-entering the connector.
#[derive(Clone)]
pub struct Environment {
    runner: Arc<dyn ProcessRunner>,
    parent_id: Uuid,
    context: Option<ContextSnapshot>,
}

impl Environment {
    pub(crate) fn new(runner: Arc<dyn ProcessRunner>, parent: &Process) -> Self {
        Self {
            runner,
            parent_id: parent.id(),
            context: parent.context().cloned(),
        }
    }

    /// Resolved context values for this invocation; empty when the process
    /// carries no context (always the case on the provider side of the
    /// distributed backend, where context does not cross the wire).
    pub fn context(&self) -> HashMap<String, ContextValue> {
        self.context
            .as_ref()
            .map(|snapshot| snapshot.values.clone())
            .unwrap_or_default()
    }

    /// Run a child process: parent id and context are stamped from the
    /// enclosing process before re-entering the connector.
    pub async fn run_child(&self, process: Process) -> Outcome {
        let mut child = process.with_parent(self.parent_id);
        if let Some(snapshot) = &self.context {
            child = child.with_context(snapshot.clone());
        }
        self.runner.run(child).outcome().await
    }
}
