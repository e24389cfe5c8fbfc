// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::connector::Outcome;
use crate::errors::TaskError;
use crate::task::{Behavior, Process, Spec};
use crate::traits::ProcessRunner;

/// One served implementation: the spec it answers for, its encased behavior,
/// and the runner used to build each dispatch's environment.
#[derive(Clone)]
pub struct Registration {
    pub spec: Arc<Spec>,
    pub behavior: Arc<dyn Behavior>,
    pub runner: Arc<dyn ProcessRunner>,
}

/// Teardown handle returned by [`Backend::provide`]. Dropping it without
/// calling [`ServeHandle::stop`] leaves the registration in place.
pub struct ServeHandle {
    stop: Box<dyn FnOnce() + Send>,
}

impl ServeHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Box::new(stop),
        }
    }

    pub fn stop(self) {
        (self.stop)();
    }
}

/// Execution seam between the connector core and a dispatch strategy.
///
/// The connector is agnostic to whether `dispatch` executes in-process (local
/// table lookup) or across a broker. `dispatch` owns the cancellation path:
/// it must observe the token, return [`Outcome::Cancelled`] promptly when it
/// fires, and release any resources held by the losing side. A dispatch that
/// has already settled wins a near-simultaneous race with cancellation.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn dispatch(&self, process: Process, cancel: CancellationToken) -> Outcome;

    async fn provide(&self, registration: Registration) -> Result<ServeHandle, TaskError>;

    async fn shutdown(&self) -> Result<(), TaskError> {
        Ok(())
    }
}
