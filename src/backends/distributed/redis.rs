// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Redis implementation of the broker contract.
//!
//! Streams map to `XADD`/`XREADGROUP`/`XACK`, keyed lists to `RPUSH`/`BLPOP`.
//! Non-blocking commands share the primary connection; blocking reads and
//! pops each take a dedicated connection from the bounded pool.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::StreamReadReply;
use tokio::sync::Mutex;

use crate::backends::distributed::{
    Broker, ConnectionFactory, ConnectionPool, ReadPosition, StreamEntry,
};
use crate::errors::BrokerError;

fn connection_error(error: redis::RedisError) -> BrokerError {
    BrokerError::Connection {
        message: error.to_string(),
    }
}

fn command_error(error: redis::RedisError) -> BrokerError {
    BrokerError::Command {
        message: error.to_string(),
    }
}

/// Pool factory duplicating connections off the shared client.
struct RedisConnectionFactory {
    client: redis::Client,
}

#[async_trait]
impl ConnectionFactory for RedisConnectionFactory {
    type Connection = MultiplexedConnection;

    async fn connect(&self) -> Result<MultiplexedConnection, BrokerError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)
    }
}

/// [`Broker`] over a Redis server.
pub struct RedisBroker {
    primary: Mutex<MultiplexedConnection>,
    pool: ConnectionPool<RedisConnectionFactory>,
}

impl RedisBroker {
    /// Connect to `url`, keeping at most `pool_size` extra connections for
    /// blocking operations.
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url).map_err(connection_error)?;
        let primary = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)?;
        Ok(Self {
            primary: Mutex::new(primary),
            pool: ConnectionPool::new(RedisConnectionFactory { client }, pool_size),
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn append(
        &self,
        stream: &str,
        field: &str,
        payload: &str,
    ) -> Result<String, BrokerError> {
        let mut primary = self.primary.lock().await;
        let id: String = redis::cmd("XADD")
            .arg(stream)
            .arg("*")
            .arg(field)
            .arg(payload)
            .query_async(&mut *primary)
            .await
            .map_err(command_error)?;
        Ok(id)
    }

    async fn create_group(&self, stream: &str, group: &str) -> Result<(), BrokerError> {
        let mut primary = self.primary.lock().await;
        let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut *primary)
            .await;
        match created {
            Ok(()) => Ok(()),
            Err(error) if error.code() == Some("BUSYGROUP") => {
                Err(BrokerError::GroupAlreadyExists {
                    stream: stream.to_string(),
                })
            }
            Err(error) => Err(command_error(error)),
        }
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        position: ReadPosition,
        count: usize,
        block: Duration,
    ) -> Result<Option<Vec<StreamEntry>>, BrokerError> {
        // Blocking reads hold the connection for the full wait.
        let mut connection = self.pool.acquire().await?;

        let mut command = redis::cmd("XREADGROUP");
        command
            .arg("GROUP")
            .arg(group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count);
        if position == ReadPosition::New {
            command.arg("BLOCK").arg(block.as_millis() as u64);
        }
        command.arg("STREAMS").arg(stream);
        match &position {
            ReadPosition::Backlog(after) => command.arg(after),
            ReadPosition::New => command.arg(">"),
        };

        let reply: Option<StreamReadReply> = command
            .query_async(&mut *connection)
            .await
            .map_err(command_error)?;
        connection.complete();

        let Some(reply) = reply else {
            // Blocking read timed out; the caller retries.
            return Ok(None);
        };

        let mut entries = Vec::new();
        for key in reply.keys {
            for delivered in key.ids {
                let mut fields = Vec::with_capacity(delivered.map.len());
                for (field, value) in delivered.map {
                    let payload: String =
                        redis::from_redis_value(&value).map_err(command_error)?;
                    fields.push((field, payload));
                }
                entries.push(StreamEntry {
                    id: delivered.id,
                    fields,
                });
            }
        }
        Ok(Some(entries))
    }

    async fn ack(&self, stream: &str, group: &str, entry_id: &str) -> Result<(), BrokerError> {
        let mut primary = self.primary.lock().await;
        let _acked: i64 = redis::cmd("XACK")
            .arg(stream)
            .arg(group)
            .arg(entry_id)
            .query_async(&mut *primary)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn push(&self, key: &str, payload: &str) -> Result<(), BrokerError> {
        let mut primary = self.primary.lock().await;
        let _length: i64 = redis::cmd("RPUSH")
            .arg(key)
            .arg(payload)
            .query_async(&mut *primary)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn pop_first(
        &self,
        keys: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, BrokerError> {
        let mut connection = self.pool.acquire().await?;
        let mut command = redis::cmd("BLPOP");
        for key in keys {
            command.arg(key);
        }
        command.arg(timeout.as_secs_f64());

        let popped: Option<(String, String)> = command
            .query_async(&mut *connection)
            .await
            .map_err(command_error)?;
        connection.complete();
        Ok(popped)
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.pool.drain();
        Ok(())
    }
}
