//! Executor traits for running mapped statements against a database backend.
//!
//! - `MappingExecutor`: INSERT/UPDATE/DELETE/SELECT for `Mapped` beans
//! - `MappingConnection`: Connecting a backend from a `ConnectionConfig`

use async_trait::async_trait;

use crate::{ColumnError, Mapped, Value};

/// Connection configuration for database backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// Connect using a database URL string.
    Url(String),
    /// Connect using a URL with an explicit pool size.
    Pool { url: String, max_connections: u32 },
}

impl ConnectionConfig {
    pub fn url(&self) -> &str {
        match self {
            ConnectionConfig::Url(url) => url,
            ConnectionConfig::Pool { url, .. } => url,
        }
    }

    /// Pool size, if one was configured.
    pub fn max_connections(&self) -> Option<u32> {
        match self {
            ConnectionConfig::Url(_) => None,
            ConnectionConfig::Pool {
                max_connections, ..
            } => Some(*max_connections),
        }
    }

    pub fn with_max_connections(self, max_connections: u32) -> Self {
        ConnectionConfig::Pool {
            url: self.url().to_string(),
            max_connections,
        }
    }
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::Url(url.to_string())
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::Url(url)
    }
}

impl From<&String> for ConnectionConfig {
    fn from(url: &String) -> Self {
        ConnectionConfig::Url(url.clone())
    }
}

/// Trait for connecting a backend.
#[async_trait]
pub trait MappingConnection: Sized + Send + Sync {
    /// Connect to the database using the provided configuration.
    async fn connect(config: impl Into<ConnectionConfig> + Send) -> Result<Self, ColumnError>;
}

/// Trait for executing mapped statements.
///
/// Every statement is generated from the bean's [`ColumnMapping`](crate::ColumnMapping)
/// and its parameters are bound through each column's query method.
#[async_trait]
pub trait MappingExecutor: Send + Sync {
    /// Insert `bean`, skipping auto-generated columns, then write the
    /// generated values back onto it. Returns the number of rows affected.
    async fn insert<B: Mapped>(&self, bean: &mut B) -> Result<u64, ColumnError>;

    /// Update every non-key, non-generated column of the row matching the bean's key.
    async fn update<B: Mapped>(&self, bean: &B) -> Result<u64, ColumnError>;

    /// Delete the row matching the bean's key.
    async fn delete<B: Mapped>(&self, bean: &B) -> Result<u64, ColumnError>;

    /// Fetch every row of the bean's table.
    async fn fetch_all<B: Mapped + Default>(&self) -> Result<Vec<B>, ColumnError>;

    /// Fetch the row whose key columns equal `key`, in key declaration order.
    async fn fetch_by_key<B: Mapped + Default>(&self, key: &[Value])
    -> Result<Option<B>, ColumnError>;
}
