// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::connector::Outcome;
use crate::middleware::Bundle;
use crate::task::Process;

/// Ordered list of bundles folded into a LIFO onion at run time.
#[derive(Clone, Default)]
pub struct Pipeline {
    bundles: Vec<Arc<dyn Bundle>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bundle. The newest registration wraps all earlier ones.
    pub fn with(mut self, bundle: Arc<dyn Bundle>) -> Self {
        self.bundles.push(bundle);
        self
    }

    pub fn register(&mut self, bundle: Arc<dyn Bundle>) {
        self.bundles.push(bundle);
    }

    /// Entry fold: newest bundle first.
    pub(crate) async fn pre(&self, mut process: Process) -> Process {
        for bundle in self.bundles.iter().rev() {
            process = bundle.pre(process).await;
        }
        process
    }

    /// Exit fold: newest bundle last.
    pub(crate) async fn post(&self, mut outcome: Outcome, process: &Process) -> Outcome {
        for bundle in self.bundles.iter() {
            outcome = bundle.post(outcome, process).await;
        }
        outcome
    }
}
