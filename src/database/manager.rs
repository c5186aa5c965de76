use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::store::{CollectionName, DocumentStore};
use crate::filter::FilterError;

/// Errors raised by the document store backends
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Builds the configured store backend
pub struct DatabaseManager;

impl DatabaseManager {
    /// Postgres when `database.url` is set, otherwise the in-memory store.
    pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
        match &config.url {
            Some(url) => {
                let pool = Self::pool(url, config).await?;
                Self::ensure_collections(&pool).await?;
                info!("Connected to Postgres document store");
                Ok(Arc::new(PgStore::new(pool)))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    async fn pool(url: &str, config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        if url.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        Ok(pool)
    }

    /// Create one `(_key, data)` table per collection when missing
    pub async fn ensure_collections(pool: &PgPool) -> Result<(), DatabaseError> {
        for collection in CollectionName::ALL {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    \"_key\" TEXT PRIMARY KEY,
                    data JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
                Self::quote_identifier(collection.table_name())
            );
            sqlx::query(&ddl).execute(pool).await?;
        }
        info!("Ensured {} collections", CollectionName::ALL.len());
        Ok(())
    }

    /// Quote SQL identifier to prevent injection
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
