//! Database connection pool and transaction primitives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use libsql::{Builder, Connection, Database, Transaction};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{Error, Result};

/// Connection settings for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
    pub auth_token: Option<String>,
    pub max_connections: usize,
    pub timeout_ms: u64,
}

impl DbConfig {
    pub fn in_memory() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            auth_token: None,
            max_connections: 1,
            timeout_ms: 5_000,
        }
    }

    pub fn local(path: impl Into<String>) -> Self {
        Self {
            database_url: path.into(),
            auth_token: None,
            max_connections: 4,
            timeout_ms: 5_000,
        }
    }

    pub fn remote(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            database_url: url.into(),
            auth_token: Some(auth_token.into()),
            max_connections: 4,
            timeout_ms: 5_000,
        }
    }

    fn is_remote(&self) -> bool {
        let url = self.database_url.trim();
        url.starts_with("libsql://") || url.starts_with("https://") || url.starts_with("http://")
    }

    fn is_in_memory(&self) -> bool {
        let url = self.database_url.trim();
        url == ":memory:" || url.starts_with("file::memory:") || url.contains("mode=memory")
    }

    // An in-memory database is one database per connection; the pool must
    // collapse to a single handle to stay coherent.
    fn pool_size(&self) -> usize {
        if self.is_in_memory() {
            1
        } else {
            self.max_connections
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Pooled database handle, cheap to clone.
#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

struct DbInner {
    // Keeps the database alive for the lifetime of pooled connections.
    _database: Database,
    connections: Mutex<Vec<Connection>>,
    semaphore: Arc<Semaphore>,
}

impl Db {
    /// Open the database and prime the connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        if config.max_connections == 0 {
            return Err(Error::Config {
                details: "max_connections must be greater than zero".to_string(),
            });
        }
        if config.timeout_ms == 0 {
            return Err(Error::Config {
                details: "timeout_ms must be greater than zero".to_string(),
            });
        }

        let database =
            tokio::time::timeout(Duration::from_millis(config.timeout_ms), open_database(config))
                .await
                .map_err(|_| Error::Connection {
                    details: format!(
                        "Timed out after {}ms while opening database",
                        config.timeout_ms
                    ),
                })??;

        let pool_size = config.pool_size();
        let mut connections = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let connection = database
                .connect()
                .map_err(|source| Error::libsql("connect database", source))?;
            connection
                .busy_timeout(Duration::from_millis(config.timeout_ms))
                .map_err(|source| Error::libsql("set busy timeout", source))?;
            connection
                .execute("PRAGMA foreign_keys = ON", ())
                .await
                .map_err(|source| Error::sql("PRAGMA foreign_keys = ON", source))?;
            connections.push(connection);
        }

        Ok(Self {
            inner: Arc::new(DbInner {
                _database: database,
                connections: Mutex::new(connections),
                semaphore: Arc::new(Semaphore::new(pool_size)),
            }),
        })
    }

    /// Borrow a connection from the pool, waiting for a free slot.
    pub(crate) async fn acquire(&self) -> Result<PooledConnection> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Connection {
                details: "Connection pool is closed".to_string(),
            })?;

        let mut connections = self.inner.connections.lock().map_err(|_| Error::Connection {
            details: "Connection pool mutex is poisoned".to_string(),
        })?;
        let connection = connections.pop().ok_or_else(|| Error::Connection {
            details: "Connection pool exhausted".to_string(),
        })?;

        Ok(PooledConnection {
            inner: self.inner.clone(),
            connection: Some(connection),
            _permit: permit,
        })
    }

    /// Begin a transaction on a pooled connection.
    pub async fn begin(&self) -> Result<DbTransaction> {
        let pooled = self.acquire().await?;
        let transaction = pooled
            .connection()?
            .transaction()
            .await
            .map_err(|source| Error::libsql("begin transaction", source))?;
        Ok(DbTransaction {
            pooled: Some(pooled),
            transaction: Some(transaction),
        })
    }
}

pub(crate) struct PooledConnection {
    inner: Arc<DbInner>,
    connection: Option<Connection>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    pub(crate) fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or_else(|| Error::Connection {
            details: "Pooled connection missing".to_string(),
        })
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Ok(mut connections) = self.inner.connections.lock() {
                connections.push(connection);
            }
        }
    }
}

/// An open transaction; dropped without [`Self::commit`] it rolls back.
pub struct DbTransaction {
    pooled: Option<PooledConnection>,
    transaction: Option<Transaction>,
}

impl DbTransaction {
    /// The transaction's connection handle; statements run inside the
    /// transaction until commit or rollback.
    pub(crate) fn connection(&self) -> Result<&Connection> {
        self.transaction
            .as_deref()
            .ok_or_else(|| Error::Transaction {
                details: "Transaction is no longer active".to_string(),
            })
    }

    pub async fn commit(mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or_else(|| Error::Transaction {
            details: "Transaction is no longer active".to_string(),
        })?;
        transaction
            .commit()
            .await
            .map_err(|source| Error::libsql("commit transaction", source))?;
        self.pooled.take();
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or_else(|| Error::Transaction {
            details: "Transaction is no longer active".to_string(),
        })?;
        transaction
            .rollback()
            .await
            .map_err(|source| Error::libsql("rollback transaction", source))?;
        self.pooled.take();
        Ok(())
    }
}

async fn open_database(config: &DbConfig) -> Result<Database> {
    let url = config.database_url.trim();
    if url.is_empty() {
        return Err(Error::Config {
            details: "database_url must be provided".to_string(),
        });
    }

    if config.is_remote() {
        let token = config.auth_token.clone().ok_or_else(|| Error::Config {
            details: "auth_token is required for remote databases".to_string(),
        })?;
        Builder::new_remote(url.to_string(), token)
            .build()
            .await
            .map_err(|source| Error::libsql("open remote database", source))
    } else {
        let path = url.strip_prefix("file:").unwrap_or(url);
        Builder::new_local(path)
            .build()
            .await
            .map_err(|source| Error::libsql("open local database", source))
    }
}
