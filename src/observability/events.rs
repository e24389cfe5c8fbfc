// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::task::{ContextSnapshot, Process};

/// Spec reference as it appears on the event stream.
#[derive(Debug, Clone, Serialize)]
pub struct SpecRecord {
    pub name: String,
}

/// Process snapshot as it appears on the event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub spec: SpecRecord,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextSnapshot>,
}

/// One instrumentation event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    Process {
        timestamp: DateTime<Utc>,
        process: ProcessRecord,
    },
    Resolution {
        timestamp: DateTime<Utc>,
        id: Uuid,
        value: Value,
    },
    Rejection {
        timestamp: DateTime<Utc>,
        id: Uuid,
        reason: Value,
    },
    Cancellation {
        timestamp: DateTime<Utc>,
        id: Uuid,
    },
}

impl Event {
    pub fn process(process: &Process) -> Self {
        Event::Process {
            timestamp: Utc::now(),
            process: ProcessRecord {
                id: process.id(),
                parent_id: process.parent_id(),
                spec: SpecRecord {
                    name: process.spec().name().to_string(),
                },
                input: process.input().clone(),
                context: process.context().cloned(),
            },
        }
    }

    pub fn resolution(id: Uuid, value: Value) -> Self {
        Event::Resolution {
            timestamp: Utc::now(),
            id,
            value,
        }
    }

    pub fn rejection(id: Uuid, reason: Value) -> Self {
        Event::Rejection {
            timestamp: Utc::now(),
            id,
            reason,
        }
    }

    pub fn cancellation(id: Uuid) -> Self {
        Event::Cancellation {
            timestamp: Utc::now(),
            id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Process { .. } => "process",
            Event::Resolution { .. } => "resolution",
            Event::Rejection { .. } => "rejection",
            Event::Cancellation { .. } => "cancellation",
        }
    }
}
