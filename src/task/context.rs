// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::connector::RunHandle;
use crate::task::Process;
use crate::traits::ProcessRunner;

/// A single scalar context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    String(String),
}

/// Context values are restricted to scalars and scalar arrays to keep wire
/// payloads small and bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl ContextValue {
    pub fn to_value(&self) -> Value {
        // Scalars serialize infallibly.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl TryFrom<Value> for ContextValue {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|_| ())
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Scalar(Scalar::String(value))
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Scalar(Scalar::Number(value))
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Scalar(Scalar::Bool(value))
    }
}

/// The immutable context record attached to a [`Process`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<Uuid>,
    pub values: HashMap<String, ContextValue>,
}

/// Hierarchical key/value bag scoping related invocations.
///
/// A context is bound to the connector that created it: [`Context::run`]
/// attaches this context's snapshot to the process before entering the
/// connector, and [`Context::child`] derives a new context whose values merge
/// the parent's with the overrides.
#[derive(Clone)]
pub struct Context {
    snapshot: ContextSnapshot,
    runner: Arc<dyn ProcessRunner>,
}

impl Context {
    pub(crate) fn root(
        values: HashMap<String, ContextValue>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            snapshot: ContextSnapshot {
                id: Uuid::new_v4(),
                parent_id: None,
                values,
            },
            runner,
        }
    }

    /// Derive a child context, merging parent values with `overrides`.
    pub fn child(&self, overrides: HashMap<String, ContextValue>) -> Self {
        let mut values = self.snapshot.values.clone();
        values.extend(overrides);
        Self {
            snapshot: ContextSnapshot {
                id: Uuid::new_v4(),
                parent_id: Some(self.snapshot.id),
                values,
            },
            runner: self.runner.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.snapshot.id
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.snapshot.parent_id
    }

    pub fn values(&self) -> &HashMap<String, ContextValue> {
        &self.snapshot.values
    }

    /// Run a process under this context.
    pub fn run(&self, process: Process) -> RunHandle {
        self.runner.run(process.with_context(self.snapshot.clone()))
    }
}
