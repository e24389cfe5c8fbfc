// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::task::{ContextSnapshot, ContextValue, Spec};

/// Immutable record describing one invocation request.
///
/// A process is never mutated in place: attaching a context, re-stamping the
/// parent, or substituting re-encoded values each produce a new `Process`.
#[derive(Clone)]
pub struct Process {
    spec: Arc<Spec>,
    id: Uuid,
    parent_id: Option<Uuid>,
    input: Value,
    context: Option<ContextSnapshot>,
}

impl Process {
    pub(crate) fn new(spec: Arc<Spec>, input: Value) -> Self {
        Self {
            spec,
            id: Uuid::new_v4(),
            parent_id: None,
            input,
            context: None,
        }
    }

    /// Rebuild a process from its wire form. Context is deliberately lossy
    /// across the distributed backend and stays `None` here.
    pub(crate) fn from_wire(
        spec: Arc<Spec>,
        id: Uuid,
        parent_id: Option<Uuid>,
        input: Value,
    ) -> Self {
        Self {
            spec,
            id,
            parent_id,
            input,
            context: None,
        }
    }

    pub fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn context(&self) -> Option<&ContextSnapshot> {
        self.context.as_ref()
    }

    pub(crate) fn with_context(mut self, context: ContextSnapshot) -> Self {
        self.context = Some(context);
        self
    }

    pub(crate) fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub(crate) fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub(crate) fn with_context_values(mut self, values: HashMap<String, ContextValue>) -> Self {
        if let Some(context) = self.context.as_mut() {
            context.values = values;
        }
        self
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("task", &self.spec.name())
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("input", &self.input)
            .field("context", &self.context)
            .finish()
    }
}

/// Pure process constructor bound to a [`Spec`].
///
/// Calling a definition allocates a fresh process id; it validates nothing
/// and executes nothing.
#[derive(Clone, Debug)]
pub struct Definition {
    spec: Arc<Spec>,
}

impl Definition {
    pub fn new(spec: Arc<Spec>) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    pub fn call(&self, input: Value) -> Process {
        Process::new(self.spec.clone(), input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::any;
    use serde_json::json;

    #[test]
    fn each_call_allocates_a_fresh_id() {
        let definition = Definition::new(Spec::new("add", any(), any()));
        let a = definition.call(json!([1, 2]));
        let b = definition.call(json!([1, 2]));
        assert_ne!(a.id(), b.id());
        assert!(a.parent_id().is_none());
        assert!(a.context().is_none());
    }
}
