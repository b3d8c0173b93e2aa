//! SQLite connection handling for the batch loaders and reports.
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
#[cfg(test)]
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{LoadError, Result};

/// Single-connection handle on the analysis database.
///
/// The loaders own the store exclusively for the duration of a run, so the
/// pool never holds more than one connection.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: SqlitePool,
    location: String,
}

impl Pool {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LoadError::StorageUnavailable {
                    location: path.display().to_string(),
                    source: sqlx::Error::Io(e),
                })?;
        }

        Self::connect(path, true).await
    }

    /// Open a database file that must already exist
    ///
    /// Nothing is created on disk when the file is missing.
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect(path.as_ref(), false).await
    }

    async fn connect(path: &Path, create_if_missing: bool) -> Result<Self> {
        let location = path.display().to_string();
        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create_if_missing);

        let inner = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|source| LoadError::StorageUnavailable {
                location: location.clone(),
                source,
            })?;

        info!(database = %location, "Opened database");
        Ok(Self { inner, location })
    }

    /// Create an in-memory database for testing
    ///
    /// The single connection is never recycled, so the database lives as long
    /// as the pool.
    #[cfg(test)]
    pub async fn sqlite_in_memory() -> Result<Self> {
        let location = "sqlite::memory:".to_string();
        let connect_options =
            SqliteConnectOptions::from_str(&location).map_err(|source| {
                LoadError::StorageUnavailable {
                    location: location.clone(),
                    source,
                }
            })?;

        let inner = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(|source| LoadError::StorageUnavailable {
                location: location.clone(),
                source,
            })?;

        Ok(Self { inner, location })
    }

    pub fn inner(&self) -> &SqlitePool {
        &self.inner
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Execute a statement without parameters (DDL like DROP / CREATE TABLE)
    pub async fn execute_query(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.inner).await?;
        Ok(())
    }

    /// Start the transaction a bulk insert runs in
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.inner.begin().await?)
    }

    /// Check whether a table exists
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table_name)
                .fetch_one(&self.inner)
                .await?;
        Ok(count > 0)
    }

    /// Release the connection
    pub async fn close(&self) {
        self.inner.close().await;
        debug!(database = %self.location, "Closed database");
    }
}
