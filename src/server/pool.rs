//! Bounded Postgres connection pool.
//!
//! Checkout-based: a semaphore caps how many connections exist at once,
//! idle clients are reused in LIFO order, and dropping a checked-out
//! connection returns it to the pool. Connections that died while idle or
//! in use are discarded on the way through rather than handed back out.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid database URL: {source}")]
    Config { source: tokio_postgres::Error },
    #[error("database connection failed: {source}")]
    Connect { source: tokio_postgres::Error },
    #[error("timed out after {0:?} waiting for a free database connection")]
    AcquireTimeout(Duration),
}

/// Source of database connections. Serving code depends on this trait, so
/// tests can stand in their own provider without a running Postgres.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> Result<PooledConnection, PoolError>;
}

#[derive(Debug)]
pub struct PgPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    config: tokio_postgres::Config,
    // Guarded for push/pop only, never held across await.
    idle: Mutex<VecDeque<Client>>,
    permits: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Duration,
}

impl PgPool {
    /// Parse the URL and set up an empty pool. No connection is dialed
    /// here; the first `acquire` does that.
    pub fn new(
        database_url: &str,
        size: usize,
        acquire_timeout: Duration,
    ) -> Result<Self, PoolError> {
        let config: tokio_postgres::Config = database_url
            .parse()
            .map_err(|source| PoolError::Config { source })?;
        log::info!("database pool ready: size={size}, acquire timeout={acquire_timeout:?}");
        Ok(PgPool {
            inner: Arc::new(PoolInner {
                config,
                idle: Mutex::new(VecDeque::new()),
                permits: Arc::new(Semaphore::new(size)),
                size,
                acquire_timeout,
            }),
        })
    }

    /// Check out a connection, waiting up to the acquire timeout for a
    /// free slot when the pool is saturated.
    pub async fn acquire(&self) -> Result<PooledConnection, PoolError> {
        let wait = self.inner.acquire_timeout;
        let permit = match timeout(wait, Arc::clone(&self.inner.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            // The semaphore is never closed, so both failure shapes mean
            // the slot did not free up in time.
            Ok(Err(_)) | Err(_) => return Err(PoolError::AcquireTimeout(wait)),
        };

        while let Some(client) = self.pop_idle() {
            if client.is_closed() {
                log::debug!("discarding dead idle connection");
                continue;
            }
            return Ok(PooledConnection::new(client, Arc::clone(&self.inner), permit));
        }

        let client = self.connect().await?;
        Ok(PooledConnection::new(client, Arc::clone(&self.inner), permit))
    }

    async fn connect(&self) -> Result<Client, PoolError> {
        let (client, connection) = self
            .inner
            .config
            .connect(NoTls)
            .await
            .map_err(|source| PoolError::Connect { source })?;
        // The connection future drives the socket; it lives in its own
        // task until the client closes.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::warn!("database connection terminated: {e}");
            }
        });
        log::debug!("dialed new database connection");
        Ok(client)
    }

    fn pop_idle(&self) -> Option<Client> {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn status(&self) -> PoolStatus {
        let idle = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        PoolStatus {
            size: self.inner.size,
            idle,
            in_use: self.inner.size - self.inner.permits.available_permits(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for PgPool {
    async fn acquire(&self) -> Result<PooledConnection, PoolError> {
        PgPool::acquire(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub size: usize,
    pub idle: usize,
    pub in_use: usize,
}

/// A checked-out connection. Dropping it returns the client to the idle
/// queue (or discards it if the backend hung up) and frees the slot.
#[derive(Debug)]
pub struct PooledConnection {
    client: Option<Client>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(client: Client, pool: Arc<PoolInner>, permit: OwnedSemaphorePermit) -> Self {
        PooledConnection { client: Some(client), pool, _permit: permit }
    }
}

impl Deref for PooledConnection {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client.as_ref().expect("client present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        if client.is_closed() {
            log::debug!("dropping closed connection instead of pooling it");
            return;
        }
        // Push happens before the permit releases (field drop order), so
        // a waiting acquire sees the idle client rather than dialing.
        self.pool
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(client);
    }
}
