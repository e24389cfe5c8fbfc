// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The dispatch protocol over the broker contract.
//!
//! Dispatcher side: encode the process, append it to the task's stream, then
//! block on the per-process result keys. Provider side: poll the stream as a
//! named consumer (draining our own backlog first), acknowledge immediately,
//! and race each execution against the per-process cancellation key.
//!
//! Delivery is at-least-once: a provider that crashes after delivery but
//! before acknowledgment sees the entry again through backlog recovery on
//! restart. Consumers are expected to be idempotent by design.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backends::distributed::{codec, Broker, ReadPosition};
use crate::config::DistributedConfig;
use crate::connector::Outcome;
use crate::errors::{BrokerError, TaskError};
use crate::task::{encase, Environment, Process};
use crate::traits::{Backend, Registration, ServeHandle};

const PROCESS_FIELD: &str = "process";
const CANCEL_SENTINEL: &str = "cancelled";

fn resolved_key(id: Uuid) -> String {
    format!("{id}/resolved")
}

fn rejected_key(id: Uuid) -> String {
    format!("{id}/rejected")
}

fn cancelled_key(id: Uuid) -> String {
    format!("{id}/cancelled")
}

struct Shared {
    broker: Arc<dyn Broker>,
    config: DistributedConfig,
    providers: Mutex<Vec<CancellationToken>>,
}

/// Broker-backed [`Backend`]: one stream per task name, one consumer group
/// of competing providers, per-process result and cancellation keys.
#[derive(Clone)]
pub struct DistributedBackend {
    shared: Arc<Shared>,
}

impl DistributedBackend {
    pub fn new(broker: Arc<dyn Broker>, config: DistributedConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                broker,
                config,
                providers: Mutex::new(Vec::new()),
            }),
        }
    }

    async fn send_process(&self, process: &Process) -> Result<(), TaskError> {
        let payload = codec::encode_process(process)?;
        self.shared
            .broker
            .append(process.spec().name(), PROCESS_FIELD, &payload)
            .await?;
        Ok(())
    }

    /// Block on both result keys at once; a timed-out poll retries, which is
    /// what keeps the wait interruptible without a false failure. Whichever
    /// key is populated first is authoritative.
    async fn wait_for_result(&self, id: Uuid) -> Outcome {
        let keys = [resolved_key(id), rejected_key(id)];
        loop {
            let popped = self
                .shared
                .broker
                .pop_first(&keys, self.shared.config.block_timeout())
                .await;
            match popped {
                Ok(None) => continue,
                Ok(Some((key, payload))) => {
                    let decoded = match codec::decode_value(&payload) {
                        Ok(value) => value.unwrap_or(Value::Null),
                        Err(error) => return Outcome::Rejected(error.into()),
                    };
                    if key == keys[0] {
                        return Outcome::Resolved(decoded);
                    }
                    return Outcome::Rejected(TaskError::Execution { reason: decoded });
                }
                Err(error) => return Outcome::Rejected(TaskError::Broker(error)),
            }
        }
    }

    /// Idempotent group creation: losing a creation race is success.
    async fn initialize_consumer_group(&self, stream: &str) -> Result<(), TaskError> {
        match self
            .shared
            .broker
            .create_group(stream, &self.shared.config.group)
            .await
        {
            Ok(()) => Ok(()),
            Err(BrokerError::GroupAlreadyExists { .. }) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[async_trait]
impl Backend for DistributedBackend {
    async fn dispatch(&self, process: Process, cancel: CancellationToken) -> Outcome {
        if let Err(error) = self.send_process(&process).await {
            return Outcome::Rejected(error);
        }
        let id = process.id();

        tokio::select! {
            biased;
            outcome = self.wait_for_result(id) => outcome,
            _ = cancel.cancelled() => {
                // Cross-process cancellation signal; the provider's
                // per-execution race observes it.
                if let Err(error) = self
                    .shared
                    .broker
                    .push(&cancelled_key(id), CANCEL_SENTINEL)
                    .await
                {
                    tracing::warn!(%id, error = %error, "failed to push cancellation signal");
                }
                Outcome::Cancelled
            }
        }
    }

    async fn provide(&self, registration: Registration) -> Result<ServeHandle, TaskError> {
        let stream = registration.spec.name().to_string();
        self.initialize_consumer_group(&stream).await?;

        let token = CancellationToken::new();
        {
            let mut providers = match self.shared.providers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            providers.push(token.clone());
        }

        let provider = Provider {
            shared: self.shared.clone(),
            registration,
            stream,
            token: token.clone(),
        };
        tokio::spawn(provider.wait_for_process());

        Ok(ServeHandle::new(move || token.cancel()))
    }

    async fn shutdown(&self) -> Result<(), TaskError> {
        let tokens: Vec<CancellationToken> = {
            let mut providers = match self.shared.providers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            providers.drain(..).collect()
        };
        for token in tokens {
            token.cancel();
        }
        self.shared.broker.disconnect().await?;
        Ok(())
    }
}

/// One provider poll loop plus its spawned per-entry receivers.
#[derive(Clone)]
struct Provider {
    shared: Arc<Shared>,
    registration: Registration,
    stream: String,
    token: CancellationToken,
}

impl Provider {
    /// Poll loop: drain our own backlog first (crash recovery), then read
    /// only new entries. A null poll is a timeout, not an error, and simply
    /// retries; an empty non-null batch while draining flips us to live
    /// mode.
    async fn wait_for_process(self) {
        let mut backlog = true;
        let mut cursor = String::from("0");
        let config = &self.shared.config;

        loop {
            let position = if backlog {
                ReadPosition::Backlog(cursor.clone())
            } else {
                ReadPosition::New
            };

            let batch = tokio::select! {
                _ = self.token.cancelled() => return,
                batch = self.shared.broker.read_group(
                    &self.stream,
                    &config.group,
                    &config.consumer,
                    position,
                    config.batch_size,
                    config.block_timeout(),
                ) => batch,
            };

            match batch {
                Ok(None) => continue,
                Ok(Some(entries)) => {
                    if backlog && entries.is_empty() {
                        backlog = false;
                        continue;
                    }
                    for entry in entries {
                        if let Err(error) = self
                            .shared
                            .broker
                            .ack(&self.stream, &config.group, &entry.id)
                            .await
                        {
                            tracing::warn!(
                                stream = %self.stream,
                                entry = %entry.id,
                                error = %error,
                                "failed to acknowledge entry"
                            );
                        }
                        if backlog {
                            cursor = entry.id.clone();
                        }
                        // Entries without a process body come from foreign
                        // writers to the same stream; skip them.
                        let Some(payload) = entry.field(PROCESS_FIELD) else {
                            tracing::debug!(
                                stream = %self.stream,
                                entry = %entry.id,
                                "skipping entry without process body"
                            );
                            continue;
                        };
                        let receiver = self.clone();
                        let payload = payload.to_string();
                        tokio::spawn(async move { receiver.receive(payload).await });
                    }
                }
                Err(BrokerError::Disconnected) => return,
                Err(error) => {
                    tracing::error!(
                        stream = %self.stream,
                        error = %error,
                        "process poll failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            }
        }
    }

    /// Decode, build the environment, and race the implementation against
    /// the cross-process cancellation signal. The losing side is abandoned;
    /// its blocking connection is released by its guard.
    async fn receive(self, payload: String) {
        let wire = match codec::decode_process(&payload) {
            Ok(wire) => wire,
            Err(error) => {
                tracing::warn!(
                    stream = %self.stream,
                    error = %error,
                    "discarding undecodable process entry"
                );
                return;
            }
        };
        let process = Process::from_wire(
            self.registration.spec.clone(),
            wire.id,
            wire.parent_id,
            wire.input,
        );
        let id = process.id();
        let environment = Environment::new(self.registration.runner.clone(), &process);

        let settled = tokio::select! {
            biased;
            result = encase(
                self.registration.behavior.as_ref(),
                process.input().clone(),
                environment,
            ) => Some(result),
            _ = self.wait_for_cancellation(id) => None,
        };

        let notified = match settled {
            Some(Ok(value)) => match codec::encode_value(Some(&value)) {
                Ok(encoded) => {
                    self.shared
                        .broker
                        .push(&resolved_key(id), &encoded)
                        .await
                }
                Err(error) => self.notify_rejection(id, error.into()).await,
            },
            Some(Err(error)) => self.notify_rejection(id, error).await,
            None => {
                // Cancelled remotely: neither result key is ever written.
                tracing::debug!(%id, task = %self.stream, "execution cancelled by dispatcher");
                return;
            }
        };

        if let Err(error) = notified {
            tracing::error!(%id, error = %error, "failed to publish outcome");
        }
    }

    async fn notify_rejection(&self, id: Uuid, error: TaskError) -> Result<(), BrokerError> {
        let reason = error.to_reason();
        match codec::encode_value(Some(&reason)) {
            Ok(encoded) => self.shared.broker.push(&rejected_key(id), &encoded).await,
            Err(encode_error) => {
                tracing::error!(%id, error = %encode_error, "failed to encode rejection");
                Ok(())
            }
        }
    }

    /// Blocking wait on the per-process cancellation key. Poll timeouts
    /// retry; broker failures back off and retry, since giving up here would
    /// silently disable cancellation for the running execution.
    async fn wait_for_cancellation(&self, id: Uuid) {
        let keys = [cancelled_key(id)];
        loop {
            match self
                .shared
                .broker
                .pop_first(&keys, self.shared.config.block_timeout())
                .await
            {
                Ok(None) => continue,
                Ok(Some(_)) => return,
                Err(BrokerError::Disconnected) => {
                    // Shutting down; pend forever and let the race be decided
                    // by the implementation side.
                    futures::future::pending::<()>().await;
                }
                Err(error) => {
                    tracing::warn!(%id, error = %error, "cancellation poll failed; retrying");
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            }
        }
    }
}
