// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end connector tests over the local backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::backends::local::LocalBackend;
use crate::connector::{Connector, Outcome};
use crate::errors::TaskError;
use crate::middleware::{Bundle, Pipeline};
use crate::observability::{Event, MemorySink};
use crate::task::{ContextValue, Definition, Implementation, Process, Spec};
use crate::validation::{any, FnValidator, Rejection, Validator};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn local_connector() -> Connector {
    init_logging();
    Connector::new(Arc::new(LocalBackend::new()))
}

fn number_array() -> Arc<dyn Validator> {
    Arc::new(FnValidator::new(|value: Value| {
        match value.as_array() {
            Some(items) if items.iter().all(Value::is_number) => Ok(value),
            _ => Err(Rejection::new(json!({ "expected": "array of numbers" }))),
        }
    }))
}

fn number() -> Arc<dyn Validator> {
    Arc::new(FnValidator::new(|value: Value| {
        if value.is_number() {
            Ok(value)
        } else {
            Err(Rejection::new(json!({ "expected": "number" })))
        }
    }))
}

fn sum(input: Value, _: crate::task::Environment) -> Result<Value, Value> {
    let total: f64 = input
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_f64).sum())
        .unwrap_or(0.0);
    Ok(json!(total))
}

#[tokio::test]
async fn resolves_through_validation_and_dispatch() {
    let connector = local_connector();
    let definition = Definition::new(Spec::new("add", number_array(), number()));
    connector
        .serve(Implementation::from_sync(definition.clone(), sum))
        .await
        .unwrap();

    let outcome = connector.run(definition.call(json!([1, 2]))).outcome().await;
    assert_eq!(outcome.resolved(), Some(json!(3.0)));
}

#[tokio::test]
async fn invalid_input_short_circuits_before_the_implementation() {
    let connector = local_connector();
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();
    let definition = Definition::new(Spec::new("add", number_array(), any()));
    connector
        .serve(Implementation::from_sync(definition.clone(), move |input, env| {
            counter.fetch_add(1, Ordering::SeqCst);
            sum(input, env)
        }))
        .await
        .unwrap();

    let outcome = connector
        .run(definition.call(json!("not an array")))
        .outcome()
        .await;
    match outcome.rejected() {
        Some(TaskError::InvalidInput { errors }) => {
            assert_eq!(errors, json!({ "expected": "array of numbers" }));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn re_encoded_input_reaches_the_implementation() {
    let upper: Arc<dyn Validator> = Arc::new(FnValidator::new(|value: Value| {
        match value.as_str() {
            Some(s) => Ok(Value::String(s.to_uppercase())),
            None => Err(Rejection::new(json!("expected string"))),
        }
    }));
    let connector = local_connector();
    let definition = Definition::new(Spec::new("shout", upper, any()));
    connector
        .serve(Implementation::from_sync(definition.clone(), |input, _| {
            Ok(input)
        }))
        .await
        .unwrap();

    let outcome = connector.run(definition.call(json!("quiet"))).outcome().await;
    assert_eq!(outcome.resolved(), Some(json!("QUIET")));
}

#[tokio::test]
async fn invalid_output_rejects_the_run() {
    let connector = local_connector();
    let definition = Definition::new(Spec::new("add", any(), number()));
    connector
        .serve(Implementation::from_sync(definition.clone(), |_, _| {
            Ok(json!("three"))
        }))
        .await
        .unwrap();

    let outcome = connector.run(definition.call(json!([1, 2]))).outcome().await;
    assert!(matches!(
        outcome.rejected(),
        Some(TaskError::InvalidOutput { .. })
    ));
}

#[tokio::test]
async fn context_rejection_names_the_offending_key() {
    let mut context_validators: HashMap<String, Arc<dyn Validator>> = HashMap::new();
    context_validators.insert("limit".to_string(), number());
    let connector = local_connector();
    let definition = Definition::new(Spec::with_context(
        "add",
        any(),
        any(),
        context_validators,
    ));
    connector
        .serve(Implementation::from_sync(definition.clone(), sum))
        .await
        .unwrap();

    let mut values = HashMap::new();
    values.insert("limit".to_string(), ContextValue::from("unbounded"));
    let context = connector.create_context(values);

    let outcome = context.run(definition.call(json!([1, 2]))).outcome().await;
    match outcome.rejected() {
        Some(TaskError::InvalidContext { context_key, .. }) => {
            assert_eq!(context_key, "limit");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn missing_implementation_rejects() {
    let connector = local_connector();
    let definition = Definition::new(Spec::new("ghost", any(), any()));
    let outcome = connector.run(definition.call(json!(null))).outcome().await;
    match outcome.rejected() {
        Some(TaskError::NoImplementation { process }) => {
            assert_eq!(process.spec().name(), "ghost");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn child_runs_inherit_parent_id_and_context() {
    let sink = Arc::new(MemorySink::new());
    let connector = Connector::instrumented(Arc::new(LocalBackend::new()), sink.clone());

    let add = Definition::new(Spec::new("add", any(), any()));
    connector
        .serve(Implementation::from_sync(add.clone(), sum))
        .await
        .unwrap();

    let child = add.clone();
    let outer = Definition::new(Spec::new("outer", any(), any()));
    connector
        .serve(Implementation::from_async(outer.clone(), move |_, env| {
            let child = child.clone();
            async move {
                match env.run_child(child.call(json!([2, 3]))).await {
                    Outcome::Resolved(value) => Ok(value),
                    other => Err(json!(format!("{other:?}"))),
                }
            }
        }))
        .await
        .unwrap();

    let mut values = HashMap::new();
    values.insert("tenant".to_string(), ContextValue::from("acme"));
    let context = connector.create_context(values);

    let process = outer.call(json!(null));
    let outer_id = process.id();
    let outcome = context.run(process).outcome().await;
    assert_eq!(outcome.resolved(), Some(json!(5.0)));

    let child_record = sink
        .events()
        .into_iter()
        .find_map(|event| match event {
            Event::Process { process, .. } if process.spec.name == "add" => Some(process),
            _ => None,
        })
        .expect("child process event not emitted");
    assert_eq!(child_record.parent_id, Some(outer_id));
    let snapshot = child_record.context.expect("child lost its context");
    assert_eq!(
        snapshot.values.get("tenant"),
        Some(&ContextValue::from("acme"))
    );
}

#[tokio::test]
async fn bundles_wrap_the_run_newest_outermost() {
    struct Recorder {
        label: &'static str,
        log: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Bundle for Recorder {
        async fn pre(&self, process: Process) -> Process {
            self.log.lock().unwrap().push(format!("{}:pre", self.label));
            process
        }

        async fn post(&self, outcome: Outcome, _process: &Process) -> Outcome {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:post", self.label));
            outcome
        }
    }

    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let pipeline = Pipeline::new()
        .with(Arc::new(Recorder {
            label: "a",
            log: log.clone(),
        }))
        .with(Arc::new(Recorder {
            label: "b",
            log: log.clone(),
        }));
    let connector = Connector::with_pipeline(Arc::new(LocalBackend::new()), pipeline);

    let definition = Definition::new(Spec::new("add", any(), any()));
    connector
        .serve(Implementation::from_sync(definition.clone(), sum))
        .await
        .unwrap();
    connector.run(definition.call(json!([1, 2]))).outcome().await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["b:pre", "a:pre", "a:post", "b:post"]
    );
}

#[tokio::test]
async fn instrumentation_reports_the_full_lifecycle() {
    let sink = Arc::new(MemorySink::new());
    let connector = Connector::instrumented(Arc::new(LocalBackend::new()), sink.clone());

    let definition = Definition::new(Spec::new("add", any(), any()));
    connector
        .serve(Implementation::from_sync(definition.clone(), sum))
        .await
        .unwrap();

    let process = definition.call(json!([1, 2]));
    let id = process.id();
    connector.run(process).outcome().await;

    let events = sink.events();
    let kinds: Vec<&str> = events.iter().map(Event::kind).collect();
    assert_eq!(kinds, vec!["process", "resolution"]);
    match &events[1] {
        Event::Resolution {
            id: event_id,
            value,
            ..
        } => {
            assert_eq!(*event_id, id);
            assert_eq!(*value, json!(3.0));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_is_observed_by_instrumentation() {
    let sink = Arc::new(MemorySink::new());
    let connector = Connector::instrumented(Arc::new(LocalBackend::new()), sink.clone());

    let definition = Definition::new(Spec::new("stall", any(), any()));
    connector
        .serve(Implementation::from_async(definition.clone(), |_, _| async {
            futures::future::pending::<Result<Value, Value>>().await
        }))
        .await
        .unwrap();

    let handle = connector.run(definition.call(json!(null)));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    handle.cancel();
    assert!(handle.outcome().await.is_cancelled());

    let kinds: Vec<&str> = sink.events().iter().map(Event::kind).collect();
    assert_eq!(kinds, vec!["process", "cancellation"]);
}
