use crate::application::ports::LocalStore;
use crate::domain::value_objects::Namespace;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// インメモリ版の LocalStore。単体テストと、永続化不要な
/// 一時セッションで使う。
#[derive(Default)]
pub struct MemoryLocalStore {
    namespaces: Arc<RwLock<HashMap<String, BTreeMap<String, String>>>>,
    fail_writes: AtomicBool,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き込みを StorageUnavailable で失敗させる（ディスクフル相当の再現）。
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable(
                "device storage is full".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<String>, AppError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(&namespace.as_key())
            .and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, namespace: &Namespace, key: &str, value: String) -> Result<(), AppError> {
        self.check_writable()?;
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(namespace.as_key())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<(), AppError> {
        self.check_writable()?;
        let mut namespaces = self.namespaces.write().await;
        if let Some(entries) = namespaces.get_mut(&namespace.as_key()) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn list_keys(&self, namespace: &Namespace) -> Result<Vec<String>, AppError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(&namespace.as_key())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn size_estimate(&self) -> Result<u64, AppError> {
        let namespaces = self.namespaces.read().await;
        let bytes = namespaces
            .iter()
            .map(|(ns, entries)| {
                entries
                    .iter()
                    .map(|(k, v)| ns.len() + k.len() + v.len())
                    .sum::<usize>()
            })
            .sum::<usize>();
        Ok(bytes as u64)
    }

    async fn clear_namespace(&self, namespace: &Namespace) -> Result<u64, AppError> {
        self.check_writable()?;
        let mut namespaces = self.namespaces.write().await;
        let removed = namespaces
            .remove(&namespace.as_key())
            .map(|entries| entries.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_failure_surfaces_storage_unavailable() {
        let store = MemoryLocalStore::new();
        let ns = Namespace::PendingMutations;

        store.set(&ns, "a", "1".to_string()).await.unwrap();
        store.fail_writes(true);

        let err = store.set(&ns, "b", "2".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable(_)));

        // 読み出しは影響を受けない
        assert_eq!(store.get(&ns, "a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_list_keys_is_fresh_per_call() {
        let store = MemoryLocalStore::new();
        let ns = Namespace::PendingMutations;

        store.set(&ns, "b", "2".to_string()).await.unwrap();
        assert_eq!(store.list_keys(&ns).await.unwrap(), vec!["b"]);

        store.set(&ns, "a", "1".to_string()).await.unwrap();
        assert_eq!(store.list_keys(&ns).await.unwrap(), vec!["a", "b"]);
    }
}
