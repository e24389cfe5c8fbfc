// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Middleware bundles and the LIFO pipeline that composes them.
//!
//! A [`Bundle`] hooks process entry (`pre`) and outcome exit (`post`). The
//! [`Pipeline`] holds bundles in registration order and folds over them at
//! run time: the most recently registered bundle is outermost. It sees the
//! process first on entry and the outcome last on exit, fully enclosing every
//! previously registered bundle. Instrumentation ordering (nested timing and
//! the like) depends on this discipline.

mod encoded;
mod instrumentation;
mod multicast;
mod pipeline;

pub use encoded::encoded;
pub use instrumentation::instrumentation;
pub use multicast::multicast;
pub use pipeline::Pipeline;

use async_trait::async_trait;

use crate::connector::Outcome;
use crate::task::Process;

/// Paired pre/post middleware hooks.
///
/// Bundles are side-effect carriers. `pre` may transform the process for
/// advanced use, but must not alter the shape validation and dispatch rely
/// on; `post` observes resolution, rejection, or cancellation exactly once
/// per run.
#[async_trait]
pub trait Bundle: Send + Sync {
    async fn pre(&self, process: Process) -> Process {
        process
    }

    async fn post(&self, outcome: Outcome, process: &Process) -> Outcome {
        let _ = process;
        outcome
    }
}
