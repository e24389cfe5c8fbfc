// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // dispatch backends (local + distributed)
pub mod config;     // distributed backend configuration
pub mod connector;  // core run/serve orchestration
pub mod errors;     // error taxonomy
pub mod middleware; // bundle pipeline
pub mod observability;
pub mod task;       // specs, processes, contexts, implementations
pub mod traits;     // backend and runner seams
pub mod validation; // validator contract

pub use connector::{Connector, Outcome, RunHandle};
pub use errors::{TaskError, TaskResult};
pub use task::{Context, Definition, Implementation, Process, Spec};
