// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use crate::connector::Outcome;
use crate::errors::TaskError;
use crate::middleware::Bundle;
use crate::task::Process;

/// Feed `inner` a view of each run whose input has been re-run through the
/// spec's input validator and whose outcome is the re-encoded dispatch
/// result.
///
/// `inner.pre` runs at process entry against the encoded view and `inner.post`
/// at outcome exit, so entry-hook instrumentation (nested timing and the like)
/// keeps its ordering. The real dispatch outcome is computed once upstream and
/// shared: this bundle never re-dispatches. Observations run as joined tasks
/// whose failures are coalesced, so an encode failure or a panicking observer
/// cannot alter or cancel the primary path, and the primary path cannot
/// cancel an observation already in flight.
///
/// The inner bundle is an observer: its `pre` transform is discarded and the
/// unmodified process continues down the real pipeline.
pub fn encoded(inner: Arc<dyn Bundle>) -> Arc<dyn Bundle> {
    Arc::new(Encoded { inner })
}

struct Encoded {
    inner: Arc<dyn Bundle>,
}

impl Encoded {
    /// Re-run the input validator to build the encoded view. A rejection
    /// means the inner bundle observes nothing for this run.
    async fn encoded_view(&self, process: &Process) -> Option<Process> {
        match process
            .spec()
            .input()
            .validate(process.input().clone())
            .await
        {
            Ok(encoded_input) => Some(process.clone().with_input(encoded_input)),
            Err(rejection) => {
                tracing::debug!(
                    task = process.spec().name(),
                    errors = %rejection.errors,
                    "encoded middleware: input re-encoding rejected"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Bundle for Encoded {
    async fn pre(&self, process: Process) -> Process {
        if let Some(view) = self.encoded_view(&process).await {
            let inner = self.inner.clone();
            let observed = tokio::spawn(async move {
                inner.pre(view).await;
            });
            if let Err(join_error) = observed.await {
                tracing::warn!(error = %join_error, "encoded observer failed on entry");
            }
        }
        process
    }

    async fn post(&self, outcome: Outcome, process: &Process) -> Outcome {
        let Some(view) = self.encoded_view(process).await else {
            return outcome;
        };

        let inner = self.inner.clone();
        let spec = process.spec().clone();
        let shared = outcome.clone();
        let observed = tokio::spawn(async move {
            let encoded_outcome = match shared {
                Outcome::Resolved(value) => match spec.output().validate(value).await {
                    Ok(encoded_value) => Outcome::Resolved(encoded_value),
                    Err(rejection) => Outcome::Rejected(TaskError::InvalidOutput {
                        errors: rejection.errors,
                    }),
                },
                other => other,
            };
            inner.post(encoded_outcome, &view).await;
        });
        if let Err(join_error) = observed.await {
            tracing::warn!(error = %join_error, "encoded observer failed on exit");
        }

        outcome
    }
}
