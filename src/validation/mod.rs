// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validator contract and the validation helpers used by the connector.
//!
//! A [`Validator`] both checks and may *re-encode* a value (for example
//! string → structured record). Callers must use the returned value, not the
//! original, downstream. The helpers here re-wrap raw rejections into the
//! typed `TaskError` family while preserving the validator's own payload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::TaskError;
use crate::task::ContextValue;

/// Raw rejection payload produced by a validator.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub errors: Value,
}

impl Rejection {
    pub fn new(errors: Value) -> Self {
        Self { errors }
    }
}

/// Check-and-re-encode contract for task inputs, outputs, and context values.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, value: Value) -> Result<Value, Rejection>;
}

/// Adapter turning a plain closure into a [`Validator`].
pub struct FnValidator<F> {
    check: F,
}

impl<F> FnValidator<F>
where
    F: Fn(Value) -> Result<Value, Rejection> + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(Value) -> Result<Value, Rejection> + Send + Sync,
{
    async fn validate(&self, value: Value) -> Result<Value, Rejection> {
        (self.check)(value)
    }
}

/// Pass-through validator accepting any value unchanged.
pub fn any() -> Arc<dyn Validator> {
    Arc::new(FnValidator::new(Ok))
}

/// Apply the spec's input validator, re-wrapping a rejection as
/// [`TaskError::InvalidInput`].
pub async fn validate_input(
    validator: &Arc<dyn Validator>,
    value: Value,
) -> Result<Value, TaskError> {
    validator
        .validate(value)
        .await
        .map_err(|rejection| TaskError::InvalidInput {
            errors: rejection.errors,
        })
}

/// Apply the spec's output validator, re-wrapping a rejection as
/// [`TaskError::InvalidOutput`].
pub async fn validate_output(
    validator: &Arc<dyn Validator>,
    value: Value,
) -> Result<Value, TaskError> {
    validator
        .validate(value)
        .await
        .map_err(|rejection| TaskError::InvalidOutput {
            errors: rejection.errors,
        })
}

/// Validate context values against the spec's declared context validators.
///
/// With no declared validators the values pass through unchanged (an empty
/// map when the process carries no context). Otherwise one validator runs per
/// declared key, all in parallel; the first rejection wins and surfaces as
/// [`TaskError::InvalidContext`] for that key. Siblings still in flight are
/// not awaited on failure. A key missing from the values map is validated as
/// `null`. On success the returned map carries the re-encoded values.
pub async fn validate_context(
    validators: &HashMap<String, Arc<dyn Validator>>,
    values: HashMap<String, ContextValue>,
) -> Result<HashMap<String, ContextValue>, TaskError> {
    if validators.is_empty() {
        return Ok(values);
    }

    let checks = validators.iter().map(|(key, validator)| {
        let raw = values
            .get(key)
            .map(ContextValue::to_value)
            .unwrap_or(Value::Null);
        let key = key.clone();
        let validator = validator.clone();
        async move {
            let validated =
                validator
                    .validate(raw)
                    .await
                    .map_err(|rejection| TaskError::InvalidContext {
                        context_key: key.clone(),
                        errors: rejection.errors,
                    })?;
            // Context values stay scalar-bounded even after re-encoding.
            let value = ContextValue::try_from(validated).map_err(|_| {
                TaskError::InvalidContext {
                    context_key: key.clone(),
                    errors: json!("context value must be a scalar or an array of scalars"),
                }
            })?;
            Ok::<(String, ContextValue), TaskError>((key, value))
        }
    });

    let validated = futures::future::try_join_all(checks).await?;

    let mut merged = values;
    for (key, value) in validated {
        merged.insert(key, value);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> Arc<dyn Validator> {
        Arc::new(FnValidator::new(|value: Value| {
            if value.is_number() {
                Ok(value)
            } else {
                Err(Rejection::new(json!({ "expected": "number" })))
            }
        }))
    }

    #[tokio::test]
    async fn input_rejection_preserves_raw_payload() {
        let err = validate_input(&number(), json!("nope")).await.unwrap_err();
        match err {
            TaskError::InvalidInput { errors } => {
                assert_eq!(errors, json!({ "expected": "number" }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn validator_may_re_encode() {
        let upper: Arc<dyn Validator> = Arc::new(FnValidator::new(|value: Value| {
            match value.as_str() {
                Some(s) => Ok(Value::String(s.to_uppercase())),
                None => Err(Rejection::new(json!("expected string"))),
            }
        }));
        let out = validate_output(&upper, json!("abc")).await.unwrap();
        assert_eq!(out, json!("ABC"));
    }

    #[tokio::test]
    async fn context_passes_through_without_validators() {
        let mut values = HashMap::new();
        values.insert("tenant".to_string(), ContextValue::from("acme"));
        let out = validate_context(&HashMap::new(), values.clone())
            .await
            .unwrap();
        assert_eq!(out, values);
    }

    #[tokio::test]
    async fn missing_context_key_rejects_with_that_key() {
        let mut validators: HashMap<String, Arc<dyn Validator>> = HashMap::new();
        validators.insert("limit".to_string(), number());
        let err = validate_context(&validators, HashMap::new())
            .await
            .unwrap_err();
        match err {
            TaskError::InvalidContext { context_key, .. } => {
                assert_eq!(context_key, "limit");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn context_validation_re_encodes_values() {
        let doubled: Arc<dyn Validator> = Arc::new(FnValidator::new(|value: Value| {
            match value.as_f64() {
                Some(n) => Ok(json!(n * 2.0)),
                None => Err(Rejection::new(json!("expected number"))),
            }
        }));
        let mut validators: HashMap<String, Arc<dyn Validator>> = HashMap::new();
        validators.insert("limit".to_string(), doubled);
        let mut values = HashMap::new();
        values.insert("limit".to_string(), ContextValue::from(21.0));
        values.insert("untouched".to_string(), ContextValue::from("kept"));

        let out = validate_context(&validators, values).await.unwrap();
        assert_eq!(out.get("limit"), Some(&ContextValue::from(42.0)));
        assert_eq!(out.get("untouched"), Some(&ContextValue::from("kept")));
    }
}
