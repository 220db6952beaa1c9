use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{KeyValueStore, StoreError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO kv_store (key, value, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[actix_web::test]
    async fn round_trips_and_overwrites_values() {
        let pool = db::memory_pool().await.unwrap();
        let store = SqliteStore::new(pool);

        assert!(store.read("clientName").await.unwrap().is_none());
        store.write("clientName", "\"Ana\"").await.unwrap();
        store.write("clientName", "\"Ana Lima\"").await.unwrap();
        assert_eq!(store.read("clientName").await.unwrap().as_deref(), Some("\"Ana Lima\""));

        store.remove("clientName").await.unwrap();
        assert!(store.read("clientName").await.unwrap().is_none());
    }
}
