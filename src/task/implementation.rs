// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::TaskError;
use crate::task::{Definition, Environment, Spec};

/// Tagged result of invoking a behavior: an immediately available result or
/// an asynchronous handle still in flight.
pub enum Invocation {
    Ready(Result<Value, Value>),
    Pending(BoxFuture<'static, Result<Value, Value>>),
}

/// Executable behavior of a task. Rejections carry an arbitrary reason
/// payload.
pub trait Behavior: Send + Sync {
    fn invoke(&self, input: Value, environment: Environment) -> Invocation;
}

/// Normalize an invocation into the single asynchronous outcome type.
///
/// This is the "encasing" boundary: behaviors that return synchronously, fail
/// synchronously, or return an async handle all flow through here exactly
/// once, so the rest of the pipeline never special-cases synchronous
/// behaviors.
pub async fn encase(
    behavior: &dyn Behavior,
    input: Value,
    environment: Environment,
) -> Result<Value, TaskError> {
    let result = match behavior.invoke(input, environment) {
        Invocation::Ready(result) => result,
        Invocation::Pending(future) => future.await,
    };
    result.map_err(|reason| TaskError::Execution { reason })
}

struct AsyncBehavior<F>(F);

impl<F, Fut> Behavior for AsyncBehavior<F>
where
    F: Fn(Value, Environment) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    fn invoke(&self, input: Value, environment: Environment) -> Invocation {
        Invocation::Pending(Box::pin((self.0)(input, environment)))
    }
}

struct SyncBehavior<F>(F);

impl<F> Behavior for SyncBehavior<F>
where
    F: Fn(Value, Environment) -> Result<Value, Value> + Send + Sync,
{
    fn invoke(&self, input: Value, environment: Environment) -> Invocation {
        Invocation::Ready((self.0)(input, environment))
    }
}

/// A definition paired with executable behavior, ready to be served against a
/// connector backend.
#[derive(Clone)]
pub struct Implementation {
    definition: Definition,
    behavior: Arc<dyn Behavior>,
}

impl Implementation {
    pub fn new(definition: Definition, behavior: Arc<dyn Behavior>) -> Self {
        Self {
            definition,
            behavior,
        }
    }

    /// Build an implementation from an async closure.
    pub fn from_async<F, Fut>(definition: Definition, behavior: F) -> Self
    where
        F: Fn(Value, Environment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        Self::new(definition, Arc::new(AsyncBehavior(behavior)))
    }

    /// Build an implementation from a plain synchronous closure.
    pub fn from_sync<F>(definition: Definition, behavior: F) -> Self
    where
        F: Fn(Value, Environment) -> Result<Value, Value> + Send + Sync + 'static,
    {
        Self::new(definition, Arc::new(SyncBehavior(behavior)))
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn spec(&self) -> &Arc<Spec> {
        self.definition.spec()
    }

    pub fn behavior(&self) -> &Arc<dyn Behavior> {
        &self.behavior
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::task::Process;
    use crate::validation::any;
    use serde_json::json;

    fn environment() -> Environment {
        let connector = Connector::new(Arc::new(crate::backends::local::LocalBackend::new()));
        let process = Definition::new(Spec::new("probe", any(), any())).call(json!(null));
        Environment::new(Arc::new(connector), &process)
    }

    fn probe_process() -> (Definition, Process) {
        let definition = Definition::new(Spec::new("probe", any(), any()));
        let process = definition.call(json!(1));
        (definition, process)
    }

    #[tokio::test]
    async fn sync_return_and_sync_failure_are_encased() {
        let (definition, _) = probe_process();
        let ok = Implementation::from_sync(definition.clone(), |input, _| Ok(input));
        let result = encase(ok.behavior().as_ref(), json!(7), environment()).await;
        assert_eq!(result.unwrap(), json!(7));

        let failing =
            Implementation::from_sync(definition, |_, _| Err(json!({ "boom": true })));
        let err = encase(failing.behavior().as_ref(), json!(7), environment())
            .await
            .unwrap_err();
        match err {
            TaskError::Execution { reason } => assert_eq!(reason, json!({ "boom": true })),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn async_behaviors_flow_through_the_same_path() {
        let (definition, _) = probe_process();
        let implementation = Implementation::from_async(definition, |input, _| async move {
            Ok(json!([input, "done"]))
        });
        let result = encase(implementation.behavior().as_ref(), json!(3), environment()).await;
        assert_eq!(result.unwrap(), json!([3, "done"]));
    }
}
