// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process backend: a shared spec-to-implementation table and trivial
//! dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connector::Outcome;
use crate::errors::TaskError;
use crate::task::{encase, Environment, Process};
use crate::traits::{Backend, Registration, ServeHandle};

struct Entry {
    generation: u64,
    registration: Registration,
}

struct State {
    table: Mutex<HashMap<Uuid, Entry>>,
    generations: AtomicU64,
}

impl State {
    fn table(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Backend keyed on [`Spec::uid`](crate::task::Spec::uid).
///
/// The table is the only shared state: mutated by `provide` and teardown,
/// read by `dispatch`. Serving the same spec twice lets the last writer win;
/// a teardown only removes its own registration.
#[derive(Clone)]
pub struct LocalBackend {
    state: Arc<State>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(State {
                table: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn dispatch(&self, process: Process, cancel: CancellationToken) -> Outcome {
        let registration = self
            .state
            .table()
            .get(&process.spec().uid())
            .map(|entry| entry.registration.clone());

        let Some(registration) = registration else {
            return Outcome::Rejected(TaskError::NoImplementation { process });
        };

        let environment = Environment::new(registration.runner.clone(), &process);
        let invocation = encase(
            registration.behavior.as_ref(),
            process.input().clone(),
            environment,
        );

        tokio::select! {
            biased;
            result = invocation => match result {
                Ok(value) => Outcome::Resolved(value),
                Err(error) => Outcome::Rejected(error),
            },
            _ = cancel.cancelled() => Outcome::Cancelled,
        }
    }

    async fn provide(&self, registration: Registration) -> Result<ServeHandle, TaskError> {
        let uid = registration.spec.uid();
        let generation = self.state.generations.fetch_add(1, Ordering::Relaxed);

        self.state.table().insert(
            uid,
            Entry {
                generation,
                registration,
            },
        );

        let state = self.state.clone();
        Ok(ServeHandle::new(move || {
            let mut table = match state.table.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Only remove our own registration; a newer serve wins.
            if table
                .get(&uid)
                .is_some_and(|entry| entry.generation == generation)
            {
                table.remove(&uid);
            }
        }))
    }
}
