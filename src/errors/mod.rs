// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for the task execution core and its backends.
//!
//! Errors are split by family: `TaskError` is what a caller's run handle can
//! reject with, `BrokerError` covers the distributed broker transport, and
//! `CodecError` covers wire encoding. Nothing in the core logs-and-swallows;
//! every failure path surfaces through one of these types.

use serde_json::{json, Value};
use thiserror::Error;

use crate::task::Process;

/// Result type alias for operations that reject with a [`TaskError`].
pub type TaskResult<T> = Result<T, TaskError>;

/// Caller-visible error taxonomy.
///
/// Validation errors preserve the validator's raw rejection payload in
/// `errors`; `NoImplementation` carries the unmatched process so mocking and
/// test layers can distinguish "no stub provided" from an implementation
/// failure.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// The process input was rejected by the spec's input validator.
    #[error("input validation failed")]
    InvalidInput { errors: Value },

    /// The dispatch result was rejected by the spec's output validator.
    #[error("output validation failed")]
    InvalidOutput { errors: Value },

    /// A declared context key was rejected by its validator.
    #[error("context validation failed for key '{context_key}'")]
    InvalidContext { context_key: String, errors: Value },

    /// No implementation is registered for the process's spec (local backend).
    #[error("no implementation registered for task '{}'", .process.spec().name())]
    NoImplementation { process: Process },

    /// The implementation itself rejected; `reason` is its raw payload.
    #[error("implementation rejected")]
    Execution { reason: Value },

    /// Broker transport failure in the distributed backend.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Wire payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invariant violation inside the core itself.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TaskError {
    /// Raw rejection payload for instrumentation and the wire.
    ///
    /// Validation errors surface their validator payload, execution errors
    /// their reason; everything else degrades to its display string.
    pub fn to_reason(&self) -> Value {
        match self {
            TaskError::InvalidInput { errors } | TaskError::InvalidOutput { errors } => {
                errors.clone()
            }
            TaskError::InvalidContext {
                context_key,
                errors,
            } => json!({ "contextKey": context_key, "errors": errors }),
            TaskError::Execution { reason } => reason.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

/// Errors raised by a broker implementation.
///
/// `GroupAlreadyExists` is a distinct variant because consumer group creation
/// is idempotent at the protocol layer: the dispatch protocol treats it as
/// success while every other broker failure propagates.
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// The consumer group has already been created for this stream.
    #[error("consumer group already exists for stream '{stream}'")]
    GroupAlreadyExists { stream: String },

    /// Connection to the broker could not be established or was lost.
    #[error("broker connection error: {message}")]
    Connection { message: String },

    /// A broker command failed.
    #[error("broker command failed: {message}")]
    Command { message: String },

    /// The broker has been shut down and no longer accepts operations.
    #[error("broker is shut down")]
    Disconnected,
}

/// Errors raised while encoding or decoding wire payloads.
#[derive(Error, Debug, Clone)]
pub enum CodecError {
    #[error("failed to encode {what}: {message}")]
    Encode {
        what: &'static str,
        message: String,
    },

    #[error("failed to decode {what}: {message}")]
    Decode {
        what: &'static str,
        message: String,
    },
}
