use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::store::{CollectionName, DocumentStore};
use crate::filter::{Filter, FilterData, SqlParam};

/// JSONB-backed store: one `(_key, data)` table per collection
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn table(collection: CollectionName) -> String {
        DatabaseManager::quote_identifier(collection.table_name())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: CollectionName, filter_data: FilterData) -> Result<Vec<Value>, DatabaseError> {
        let mut filter = Filter::new(collection.table_name())?;
        filter.assign(filter_data)?;
        let sql = filter.to_sql()?;
        debug!("find {}: {}", collection, sql.query);

        let mut query = sqlx::query(&sql.query);
        for param in sql.params {
            query = match param {
                SqlParam::Json(value) => query.bind(value),
                SqlParam::Text(text) => query.bind(text),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("data").map_err(DatabaseError::from))
            .collect()
    }

    async fn get(&self, collection: CollectionName, key: &str) -> Result<Option<Value>, DatabaseError> {
        let query = format!("SELECT data FROM {} WHERE \"_key\" = $1", Self::table(collection));
        let row = sqlx::query(&query).bind(key).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<Value, _>("data")?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, collection: CollectionName, key: &str, document: Value) -> Result<(), DatabaseError> {
        let query = format!("INSERT INTO {} (\"_key\", data) VALUES ($1, $2)", Self::table(collection));
        let result = sqlx::query(&query).bind(key).bind(document).execute(&self.pool).await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DatabaseError::Conflict(collection.document_id(key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, collection: CollectionName, key: &str, document: Value) -> Result<(), DatabaseError> {
        let query = format!(
            "UPDATE {} SET data = $2, updated_at = now() WHERE \"_key\" = $1",
            Self::table(collection)
        );
        let result = sqlx::query(&query).bind(key).bind(document).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(collection.document_id(key)));
        }
        Ok(())
    }

    async fn remove(&self, collection: CollectionName, key: &str) -> Result<bool, DatabaseError> {
        let query = format!("DELETE FROM {} WHERE \"_key\" = $1", Self::table(collection));
        let result = sqlx::query(&query).bind(key).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
