//! PostgreSQL document store backed by a single JSONB table.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{DocumentStore, StoreError};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(body),)| body))
    }

    async fn put(&self, collection: &str, id: &str, body: Value) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, body, updated_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()")
            .bind(collection).bind(id).bind(Json(body)).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let rows: Vec<(String, Json<Value>)> = sqlx::query_as("SELECT id, body FROM documents WHERE collection = $1 ORDER BY id")
            .bind(collection).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id, Json(body))| (id, body)).collect())
    }

    async fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Option<(String, Value)>, StoreError> {
        let row: Option<(String, Json<Value>)> = sqlx::query_as("SELECT id, body FROM documents WHERE collection = $1 AND body ->> $2 = $3 ORDER BY id LIMIT 1")
            .bind(collection).bind(field).bind(value).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, Json(body))| (id, body)))
    }
}
