use crate::application::ports::LocalStore;
use crate::domain::value_objects::Namespace;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// sqlx/SQLite 上の名前空間付きKVストア。
///
/// 名前空間ごとの書き込みロックで set/delete を直列化する。
/// 端末内のプロセスは常に1つなのでプロセス内ロックで足りる。
pub struct SqliteLocalStore {
    pool: Pool<Sqlite>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SqliteLocalStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }

    /// テスト用のインメモリデータベース。
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn namespace_lock(&self, namespace: &Namespace) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(namespace.as_key())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT value FROM local_store
            WHERE namespace = ?1 AND key = ?2
            "#,
        )
        .bind(namespace.as_key())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, namespace: &Namespace, key: &str, value: String) -> Result<(), AppError> {
        let lock = self.namespace_lock(namespace).await;
        let _guard = lock.lock().await;

        sqlx::query(
            r#"
            INSERT INTO local_store (namespace, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(namespace.as_key())
        .bind(key)
        .bind(&value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<(), AppError> {
        let lock = self.namespace_lock(namespace).await;
        let _guard = lock.lock().await;

        sqlx::query(
            r#"
            DELETE FROM local_store
            WHERE namespace = ?1 AND key = ?2
            "#,
        )
        .bind(namespace.as_key())
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn list_keys(&self, namespace: &Namespace) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT key FROM local_store
            WHERE namespace = ?1
            ORDER BY key ASC
            "#,
        )
        .bind(namespace.as_key())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.get::<String, _>("key")).collect())
    }

    async fn size_estimate(&self) -> Result<u64, AppError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(LENGTH(namespace) + LENGTH(key) + LENGTH(value)), 0) AS bytes
            FROM local_store
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let bytes: i64 = row.try_get("bytes").unwrap_or(0);
        Ok(bytes.max(0) as u64)
    }

    async fn clear_namespace(&self, namespace: &Namespace) -> Result<u64, AppError> {
        let lock = self.namespace_lock(namespace).await;
        let _guard = lock.lock().await;

        let result = sqlx::query(
            r#"
            DELETE FROM local_store
            WHERE namespace = ?1
            "#,
        )
        .bind(namespace.as_key())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EntityKind;

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        let ns = Namespace::Settings;

        store
            .set(&ns, "current", r#"{"dark_mode":true}"#.to_string())
            .await
            .unwrap();

        let value = store.get(&ns, "current").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"dark_mode":true}"#));
        assert!(store.get(&ns, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites_in_place() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        let ns = Namespace::Settings;

        store.set(&ns, "current", "v1".to_string()).await.unwrap();
        store.set(&ns, "current", "v2".to_string()).await.unwrap();

        assert_eq!(store.get(&ns, "current").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.list_keys(&ns).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        let cache = Namespace::Cache(EntityKind::MoodEntry);
        let queue = Namespace::PendingMutations;

        store.set(&cache, "a", "cached".to_string()).await.unwrap();
        store.set(&queue, "a", "queued".to_string()).await.unwrap();

        let removed = store.clear_namespace(&cache).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&cache, "a").await.unwrap().is_none());
        assert_eq!(store.get(&queue, "a").await.unwrap().as_deref(), Some("queued"));
    }

    #[tokio::test]
    async fn test_size_estimate_grows_with_content() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        let before = store.size_estimate().await.unwrap();

        store
            .set(&Namespace::PendingMutations, "k", "x".repeat(128))
            .await
            .unwrap();

        let after = store.size_estimate().await.unwrap();
        assert!(after >= before + 128);
    }
}
