use crate::application::ports::LocalStore;
use crate::application::services::mutation_queue::{PendingMutationQueue, QueueCounts};
use crate::domain::entities::{OfflineRecord, StorageInfo};
use crate::domain::value_objects::{EntityKind, Namespace, RecordId};
use crate::shared::config::StorageConfig;
use crate::shared::error::AppError;
use std::sync::Arc;

/// オフラインデータ管理画面の裏側。ストレージ概況の集計と、
/// キャッシュ削除・保持期間の整理を担う。
pub struct OfflineDataService {
    store: Arc<dyn LocalStore>,
    queue: Arc<PendingMutationQueue>,
    config: StorageConfig,
}

impl OfflineDataService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<PendingMutationQueue>,
        config: StorageConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// 表示のたびに計算する。キャッシュはしない。
    pub async fn storage_info(&self) -> Result<StorageInfo, AppError> {
        let total_bytes = self.store.size_estimate().await?;
        let counts = self.queue.count_by_status().await?;

        let mut cached_items = counts.synced;
        for kind in EntityKind::ALL {
            cached_items += self
                .store
                .list_keys(&Namespace::Cache(kind))
                .await?
                .len() as u64;
        }

        Ok(StorageInfo {
            total_bytes,
            pending_items: counts.unsynced(),
            cached_items,
        })
    }

    pub async fn queue_counts(&self) -> Result<QueueCounts, AppError> {
        self.queue.count_by_status().await
    }

    /// 同期済みキャッシュだけを落とす。pending / failed のキュー分と
    /// 設定・チュートリアルのローカルコピーには触れない。
    pub async fn clear_cache(&self) -> Result<u64, AppError> {
        let mut removed = 0u64;
        for kind in EntityKind::ALL {
            removed += self.store.clear_namespace(&Namespace::Cache(kind)).await?;
        }
        removed += u64::from(self.queue.clear_synced().await?);
        tracing::info!(target: "sync::storage", count = removed, "cleared synced cache");
        Ok(removed)
    }

    /// 保持期間を過ぎた同期済みレコードの整理。起動時などに呼ぶ。
    pub async fn prune(&self) -> Result<u32, AppError> {
        self.queue
            .prune(chrono::Duration::days(self.config.retention_days))
            .await
    }

    pub async fn list_pending(
        &self,
        entity_kind: Option<EntityKind>,
    ) -> Result<Vec<OfflineRecord>, AppError> {
        self.queue.list_pending(entity_kind).await
    }

    /// failed レコードの明示的な再投入。次のパスで再試行される。
    pub async fn retry(&self, id: &RecordId) -> Result<(), AppError> {
        self.queue.retry(id).await
    }
}
