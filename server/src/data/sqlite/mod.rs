//! SQLite database service
//!
//! Owns the connection pool resources are served from:
//! - WAL mode for concurrent reads during writes
//! - Optional schema bootstrap from a SQL file at startup
//! - Periodic WAL checkpointing until shutdown

pub mod error;
pub mod repositories;
mod repository_impl;

pub use error::SqliteError;
pub use sqlx::SqlitePool;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::log::LevelFilter;

use crate::core::config::DatabaseConfig;
use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_CHECKPOINT_INTERVAL_SECS};
use crate::data::traits::ResourceStore;

/// SQLite database service
///
/// Created once at server startup and shared by every resource.
pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Open the pool and run the schema file when one is configured
    pub async fn init(config: &DatabaseConfig) -> Result<Self, SqliteError> {
        let in_memory = is_memory_url(&config.url);

        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .log_statements(LevelFilter::Trace);
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // every connection to :memory: is a separate database
        let max_connections = if in_memory { 1 } else { config.max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let service = Self { pool };
        if let Some(path) = &config.schema_file {
            service.run_schema_file(path).await?;
        }

        tracing::debug!(url = %config.url, max_connections, "SqliteService initialized");
        Ok(service)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the store trait object handlers are built on
    pub fn store(self: &Arc<Self>) -> Arc<dyn ResourceStore> {
        Arc::new(Arc::clone(self))
    }

    /// Create a SqliteService from an existing pool (primarily for testing)
    #[cfg(test)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn run_schema_file(&self, path: &Path) -> Result<(), SqliteError> {
        let sql = tokio::fs::read_to_string(path).await?;
        sqlx::raw_sql(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| SqliteError::SchemaFailed {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        tracing::info!(path = %path.display(), "Applied schema file");
        Ok(())
    }

    pub async fn checkpoint(&self) -> Result<(), SqliteError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        tracing::debug!("WAL checkpoint completed");
        Ok(())
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }

    pub fn start_checkpoint_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let db = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SQLITE_CHECKPOINT_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("WAL checkpoint task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = db.checkpoint().await {
                            tracing::warn!("WAL checkpoint failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
