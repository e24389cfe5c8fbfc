// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use crate::connector::Outcome;
use crate::middleware::Bundle;
use crate::task::Process;

/// Run N bundles against the same cached process and outcome, in parallel.
///
/// Inner bundles are observers: their `pre` transforms are discarded, which
/// is what allows each bundle's failure to be coalesced. One observer
/// panicking cannot cancel another's observation or alter the primary
/// outcome.
pub fn multicast(bundles: Vec<Arc<dyn Bundle>>) -> Arc<dyn Bundle> {
    Arc::new(Multicast { bundles })
}

struct Multicast {
    bundles: Vec<Arc<dyn Bundle>>,
}

impl Multicast {
    async fn fan_out<F>(&self, observe: F)
    where
        F: Fn(Arc<dyn Bundle>) -> tokio::task::JoinHandle<()>,
    {
        let handles: Vec<_> = self.bundles.iter().cloned().map(observe).collect();
        for handle in handles {
            if let Err(join_error) = handle.await {
                tracing::warn!(error = %join_error, "multicast observer failed");
            }
        }
    }
}

#[async_trait]
impl Bundle for Multicast {
    async fn pre(&self, process: Process) -> Process {
        self.fan_out(|bundle| {
            let view = process.clone();
            tokio::spawn(async move {
                bundle.pre(view).await;
            })
        })
        .await;
        process
    }

    async fn post(&self, outcome: Outcome, process: &Process) -> Outcome {
        self.fan_out(|bundle| {
            let shared = outcome.clone();
            let view = process.clone();
            tokio::spawn(async move {
                bundle.post(shared, &view).await;
            })
        })
        .await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Definition, Spec};
    use crate::validation::any;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Counting {
        observed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Bundle for Counting {
        async fn post(&self, outcome: Outcome, _process: &Process) -> Outcome {
            if outcome.is_resolved() {
                self.observed.fetch_add(1, Ordering::SeqCst);
            }
            outcome
        }
    }

    struct Panicking;

    #[async_trait]
    impl Bundle for Panicking {
        async fn post(&self, _outcome: Outcome, _process: &Process) -> Outcome {
            panic!("observer blew up");
        }
    }

    struct Transforming;

    #[async_trait]
    impl Bundle for Transforming {
        async fn post(&self, _outcome: Outcome, _process: &Process) -> Outcome {
            Outcome::Resolved(json!("hijacked"))
        }
    }

    fn noop_process() -> Process {
        Definition::new(Spec::new("noop", any(), any())).call(json!(null))
    }

    #[tokio::test]
    async fn all_observers_see_the_same_cached_outcome() {
        let observed = Arc::new(AtomicUsize::new(0));
        let bundle = multicast(vec![
            Arc::new(Counting {
                observed: observed.clone(),
            }),
            Arc::new(Counting {
                observed: observed.clone(),
            }),
            Arc::new(Counting {
                observed: observed.clone(),
            }),
        ]);

        let process = noop_process();
        let outcome = bundle.post(Outcome::Resolved(json!(1)), &process).await;
        assert_eq!(outcome.resolved(), Some(json!(1)));
        assert_eq!(observed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn one_failing_observer_cannot_cancel_the_others() {
        let observed = Arc::new(AtomicUsize::new(0));
        let bundle = multicast(vec![
            Arc::new(Panicking),
            Arc::new(Counting {
                observed: observed.clone(),
            }),
        ]);

        let process = noop_process();
        let outcome = bundle.post(Outcome::Resolved(json!(1)), &process).await;
        assert!(outcome.is_resolved());
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn observer_transforms_are_discarded() {
        let bundle = multicast(vec![Arc::new(Transforming)]);
        let process = noop_process();
        let outcome = bundle.post(Outcome::Resolved(json!("real")), &process).await;
        assert_eq!(outcome.resolved(), Some(json!("real")));
    }

    // pre fan-out shares the process without letting observers replace it
    #[tokio::test]
    async fn pre_is_observation_only() {
        struct PreLogger {
            log: Arc<Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl Bundle for PreLogger {
            async fn pre(&self, process: Process) -> Process {
                self.log
                    .lock()
                    .unwrap()
                    .push(process.spec().name().to_string());
                process
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let bundle = multicast(vec![Arc::new(PreLogger { log: log.clone() })]);
        let process = noop_process();
        let id = process.id();
        let process = bundle.pre(process).await;
        assert_eq!(process.id(), id);
        assert_eq!(*log.lock().unwrap(), vec!["noop".to_string()]);
    }
}
