// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connector::Outcome;
use crate::errors::TaskError;

/// Handle to an in-flight `Connector::run`.
///
/// `cancel` stops consuming the dispatch's eventual value and triggers the
/// backend's cancellation path; if the outcome has already settled, the
/// settled outcome wins and the cancellation is a no-op.
pub struct RunHandle {
    task: JoinHandle<Outcome>,
    cancel: CancellationToken,
}

impl RunHandle {
    pub(crate) fn new(task: JoinHandle<Outcome>, cancel: CancellationToken) -> Self {
        Self { task, cancel }
    }

    /// Request cancellation of this run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Await the settled outcome.
    pub async fn outcome(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_error) => Outcome::Rejected(TaskError::Internal {
                message: format!("run task failed: {join_error}"),
            }),
        }
    }
}
