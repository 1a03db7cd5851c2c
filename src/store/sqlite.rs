use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use crate::AppResult;

use super::KeyValueStore;

/// Key/value pairs in a single sqlite table, so identity and the last room
/// survive a restart of the host.
#[derive(Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> AppResult<SqliteStore> {
        // one connection: an in-memory url would otherwise hand out a fresh db per connection
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;

        Self::from_pool(db_pool).await
    }

    pub async fn from_pool(db_pool: SqlitePool) -> AppResult<SqliteStore> {
        sqlx::query("CREATE TABLE IF NOT EXISTS kv (name TEXT PRIMARY KEY, value TEXT NOT NULL)")
            .execute(&db_pool)
            .await?;

        Ok(SqliteStore { db_pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE name=?")
            .bind(key)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(value.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO kv (name,value) VALUES (?,?) ON CONFLICT(name) DO UPDATE SET value=excluded.value")
            .bind(key)
            .bind(value)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM kv WHERE name=?")
            .bind(key)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}
