// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::TaskError;

/// Settled result of running a process.
///
/// Cancellation is a distinct terminal state, not a rejection: it has its own
/// middleware hook and its own propagation path to the remote side.
#[derive(Debug, Clone)]
pub enum Outcome {
    Resolved(Value),
    Rejected(TaskError),
    Cancelled,
}

impl Outcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The resolved value, if any.
    pub fn resolved(self) -> Option<Value> {
        match self {
            Outcome::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// The rejection, if any.
    pub fn rejected(self) -> Option<TaskError> {
        match self {
            Outcome::Rejected(error) => Some(error),
            _ => None,
        }
    }
}
