// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded pool of blocking-capable broker connections.
//!
//! Blocking protocol operations occupy a connection for their full wait and
//! cannot share it with other traffic, so each one performs scoped
//! acquisition here. The permit is released in the guard's `Drop`, which
//! covers every exit path: success, failure, and cancellation. The connection
//! itself is only recycled when the caller marks the command complete; a
//! guard dropped mid-command (a cancelled blocking wait) still has its
//! command outstanding server-side, so that connection is discarded instead
//! of returned to the idle list.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::BrokerError;

/// Source of fresh pool connections.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Connection: Send;

    async fn connect(&self) -> Result<Self::Connection, BrokerError>;
}

/// Bounded pool of duplicated connections for blocking operations.
pub struct ConnectionPool<F: ConnectionFactory> {
    factory: F,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<F::Connection>>,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    pub fn new(factory: F, size: usize) -> Self {
        Self {
            factory,
            permits: Arc::new(Semaphore::new(size)),
            idle: Mutex::new(Vec::with_capacity(size)),
        }
    }

    /// Acquire a connection, waiting for a slot if the pool is exhausted.
    pub async fn acquire(&self) -> Result<PooledConnection<'_, F>, BrokerError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BrokerError::Disconnected)?;

        let idle = {
            let mut idle = match self.idle.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            idle.pop()
        };

        let connection = match idle {
            Some(connection) => connection,
            None => self.factory.connect().await?,
        };

        Ok(PooledConnection {
            connection: Some(connection),
            pool: self,
            completed: false,
            _permit: permit,
        })
    }

    /// Drop all idle connections and refuse further acquisitions.
    pub fn drain(&self) {
        self.permits.close();
        let mut idle = match self.idle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        idle.clear();
    }

    fn release(&self, connection: F::Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(connection);
        }
    }
}

/// Scoped connection handle.
///
/// Callers must call [`PooledConnection::complete`] once their command has
/// returned; only completed connections go back on the idle list.
pub struct PooledConnection<'a, F: ConnectionFactory> {
    connection: Option<F::Connection>,
    pool: &'a ConnectionPool<F>,
    completed: bool,
    _permit: OwnedSemaphorePermit,
}

impl<F: ConnectionFactory> PooledConnection<'_, F> {
    /// Mark the held connection safe for reuse. A guard dropped without this
    /// call discards its connection.
    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl<F: ConnectionFactory> Deref for PooledConnection<'_, F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref().expect("connection taken")
    }
}

impl<F: ConnectionFactory> DerefMut for PooledConnection<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut().expect("connection taken")
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<'_, F> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if self.completed {
                self.pool.release(connection);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Numbered {
        opened: AtomicU32,
    }

    #[async_trait]
    impl ConnectionFactory for Numbered {
        type Connection = u32;

        async fn connect(&self) -> Result<u32, BrokerError> {
            Ok(self.opened.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn numbered_pool(size: usize) -> ConnectionPool<Numbered> {
        ConnectionPool::new(
            Numbered {
                opened: AtomicU32::new(0),
            },
            size,
        )
    }

    #[tokio::test]
    async fn completed_connections_are_recycled() {
        let pool = numbered_pool(2);

        let first = pool.acquire().await.unwrap();
        assert_eq!(*first, 0);
        first.complete();

        let again = pool.acquire().await.unwrap();
        assert_eq!(*again, 0);
    }

    #[tokio::test]
    async fn connections_dropped_mid_command_are_discarded() {
        let pool = numbered_pool(2);

        // Dropped without complete(): the blocking command is still
        // outstanding on the connection, so it must not be reused.
        let abandoned = pool.acquire().await.unwrap();
        assert_eq!(*abandoned, 0);
        drop(abandoned);

        let fresh = pool.acquire().await.unwrap();
        assert_eq!(*fresh, 1);
    }

    #[tokio::test]
    async fn discarding_still_releases_the_slot() {
        let pool = numbered_pool(1);

        drop(pool.acquire().await.unwrap());
        // With the single permit freed, the next acquisition succeeds.
        let next = pool.acquire().await.unwrap();
        assert_eq!(*next, 1);
    }

    #[tokio::test]
    async fn drained_pools_refuse_acquisition() {
        let pool = numbered_pool(1);
        pool.drain();
        assert!(matches!(
            pool.acquire().await,
            Err(BrokerError::Disconnected)
        ));
    }
}
