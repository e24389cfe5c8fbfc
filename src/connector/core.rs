// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::connector::{Outcome, RunHandle};
use crate::errors::TaskError;
use crate::middleware::{instrumentation, Pipeline};
use crate::observability::EventSink;
use crate::task::{Context, ContextValue, Implementation, Process};
use crate::traits::{Backend, ProcessRunner, Registration, ServeHandle};
use crate::validation::{validate_context, validate_input, validate_output};

/// Orchestrates validation, dispatch, output validation, and middleware
/// around an abstract backend.
///
/// `run` drives the full pipeline: pre-middleware, then concurrent
/// input/context validation, then `dispatch`, then output validation, then
/// post-middleware. The backend decides whether dispatch executes in-process
/// or across a broker; the connector never knows the difference.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn Backend>,
    pipeline: Pipeline,
}

impl Connector {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_pipeline(backend, Pipeline::new())
    }

    pub fn with_pipeline(backend: Arc<dyn Backend>, pipeline: Pipeline) -> Self {
        Self {
            inner: Arc::new(Inner { backend, pipeline }),
        }
    }

    /// Connector with the default instrumentation bundle registered.
    pub fn instrumented(backend: Arc<dyn Backend>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_pipeline(backend, Pipeline::new().with(instrumentation(sink)))
    }

    /// Run a process through the full pipeline, returning a cancellable
    /// handle.
    pub fn run(&self, process: Process) -> RunHandle {
        let cancel = CancellationToken::new();
        let connector = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { connector.execute(process, token).await });
        RunHandle::new(task, cancel)
    }

    async fn execute(&self, process: Process, cancel: CancellationToken) -> Outcome {
        let process = self.inner.pipeline.pre(process).await;

        // Input and context validation run concurrently against the same
        // process; either failure short-circuits before the implementation is
        // ever invoked.
        let context_values = process
            .context()
            .map(|snapshot| snapshot.values.clone())
            .unwrap_or_default();
        let validated = tokio::try_join!(
            validate_input(process.spec().input(), process.input().clone()),
            validate_context(process.spec().context(), context_values),
        );

        let dispatched = match validated {
            Ok((input, values)) => {
                let substituted = process.clone().with_input(input);
                if process.context().is_some() {
                    substituted.with_context_values(values)
                } else {
                    substituted
                }
            }
            Err(error) => {
                return self
                    .inner
                    .pipeline
                    .post(Outcome::Rejected(error), &process)
                    .await;
            }
        };

        let outcome = self
            .inner
            .backend
            .dispatch(dispatched.clone(), cancel.clone())
            .await;

        let outcome = match outcome {
            Outcome::Resolved(value) => {
                match validate_output(dispatched.spec().output(), value).await {
                    Ok(value) => Outcome::Resolved(value),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            other => other,
        };

        self.inner.pipeline.post(outcome, &process).await
    }

    /// Register an implementation with the backend. The returned handle tears
    /// the registration down.
    pub async fn serve(&self, implementation: Implementation) -> Result<ServeHandle, TaskError> {
        let registration = Registration {
            spec: implementation.spec().clone(),
            behavior: implementation.behavior().clone(),
            runner: Arc::new(self.clone()),
        };
        self.inner.backend.provide(registration).await
    }

    /// Build a root context bound to this connector's `run`.
    pub fn create_context(&self, values: HashMap<String, ContextValue>) -> Context {
        Context::root(values, Arc::new(self.clone()))
    }

    /// Shut the backend down (drain connections, stop provider loops).
    pub async fn shutdown(&self) -> Result<(), TaskError> {
        self.inner.backend.shutdown().await
    }
}

impl ProcessRunner for Connector {
    fn run(&self, process: Process) -> RunHandle {
        Connector::run(self, process)
    }
}
