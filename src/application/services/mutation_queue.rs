use crate::application::ports::LocalStore;
use crate::domain::entities::OfflineRecord;
use crate::domain::value_objects::{EntityKind, Namespace, RecordId, RemoteId, SyncStatus};
use crate::shared::error::AppError;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 残存レコードの内訳。StorageInfo とキューキャップ判定に使う。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: u64,
    pub syncing: u64,
    pub failed: u64,
    pub synced: u64,
}

impl QueueCounts {
    pub fn unsynced(&self) -> u64 {
        self.pending + self.syncing + self.failed
    }
}

/// `pending-mutations` 名前空間上の順序付き永続キュー。
/// ストレージエンジンは持たず、LocalStore のビューとして動く。
pub struct PendingMutationQueue {
    store: Arc<dyn LocalStore>,
    max_queue_len: usize,
}

impl PendingMutationQueue {
    pub fn new(store: Arc<dyn LocalStore>, max_queue_len: usize) -> Self {
        Self {
            store,
            max_queue_len,
        }
    }

    /// キューへの追記。キャップ超過時はまず最古の synced（リモートに
    /// 残っている）を退避し、次に最古の failed。それでも空きがなければ
    /// QueueFull（pending は決して捨てない）。
    pub async fn enqueue(&self, record: OfflineRecord) -> Result<RecordId, AppError> {
        let mut records = self.load_all().await?;

        while records.len() >= self.max_queue_len {
            let Some(evicted) = Self::oldest_evictable(&records) else {
                return Err(AppError::QueueFull(format!(
                    "queue holds {} records and none are evictable",
                    records.len()
                )));
            };
            tracing::warn!(
                target: "sync::queue",
                record_id = %evicted,
                "queue at capacity, evicting record"
            );
            self.store
                .delete(&Namespace::PendingMutations, evicted.as_str())
                .await?;
            records.retain(|r| r.id != evicted);
        }

        let id = record.id.clone();
        self.persist(&record).await?;
        tracing::debug!(
            target: "sync::queue",
            record_id = %id,
            entity = %record.entity_kind,
            operation = %record.operation,
            "mutation queued"
        );
        Ok(id)
    }

    /// 同じ (entity, owner, stream) の pending レコードを置き換えて
    /// 追記する。設定スナップショットのように差分を積まないストリーム用。
    pub async fn enqueue_replacing(&self, record: OfflineRecord) -> Result<RecordId, AppError> {
        let existing = self.load_all().await?;
        for prior in existing.iter().filter(|r| {
            r.entity_kind == record.entity_kind
                && r.owner == record.owner
                && r.stream_key == record.stream_key
                && r.sync_status == SyncStatus::Pending
        }) {
            self.store
                .delete(&Namespace::PendingMutations, prior.id.as_str())
                .await?;
        }
        self.enqueue(record).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<OfflineRecord, AppError> {
        let value = self
            .store
            .get(&Namespace::PendingMutations, id.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("queued record {id}")))?;
        Ok(serde_json::from_str(&value)?)
    }

    /// `pending | failed` を capturedAt 昇順で返す。毎回読み直す。
    pub async fn list_pending(
        &self,
        entity_kind: Option<EntityKind>,
    ) -> Result<Vec<OfflineRecord>, AppError> {
        let mut records: Vec<OfflineRecord> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| {
                matches!(r.sync_status, SyncStatus::Pending | SyncStatus::Failed)
                    && entity_kind.is_none_or(|kind| r.entity_kind == kind)
            })
            .collect();
        Self::sort_by_capture(&mut records);
        Ok(records)
    }

    /// 未同期（pending / syncing / failed）のレコード。readCached の
    /// 楽観表示と StorageInfo が使う。
    pub async fn list_unsynced(
        &self,
        entity_kind: Option<EntityKind>,
    ) -> Result<Vec<OfflineRecord>, AppError> {
        let mut records: Vec<OfflineRecord> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| {
                r.sync_status.is_unsynced()
                    && entity_kind.is_none_or(|kind| r.entity_kind == kind)
            })
            .collect();
        Self::sort_by_capture(&mut records);
        Ok(records)
    }

    /// 直近に同期された同一ストリームのリモートID。ローカル専用IDと
    /// サーバ採番IDの突き合わせに使う。
    pub async fn latest_synced_remote_id(
        &self,
        entity_kind: EntityKind,
        owner: &crate::domain::value_objects::UserId,
        stream_key: Option<&str>,
    ) -> Result<Option<RemoteId>, AppError> {
        let mut synced: Vec<OfflineRecord> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| {
                r.sync_status == SyncStatus::Synced
                    && r.entity_kind == entity_kind
                    && r.owner == *owner
                    && r.stream_key.as_deref() == stream_key
            })
            .collect();
        synced.sort_by(|a, b| a.synced_at.cmp(&b.synced_at));
        Ok(synced.pop().and_then(|r| r.remote_id))
    }

    /// リコンシリエーションの対象スナップショット。failed は
    /// 明示的な retry を経るまで再試行しない。
    pub async fn list_drainable(&self) -> Result<Vec<OfflineRecord>, AppError> {
        let mut records: Vec<OfflineRecord> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| r.sync_status == SyncStatus::Pending)
            .collect();
        Self::sort_by_capture(&mut records);
        Ok(records)
    }

    pub async fn mark_syncing(&self, id: &RecordId) -> Result<(), AppError> {
        let mut record = self.get(id).await?;
        record.begin_sync()?;
        self.persist(&record).await
    }

    pub async fn mark_synced(&self, id: &RecordId, remote_id: RemoteId) -> Result<(), AppError> {
        let mut record = self.get(id).await?;
        record.complete(remote_id)?;
        self.persist(&record).await
    }

    pub async fn mark_failed(&self, id: &RecordId, error: String) -> Result<(), AppError> {
        let mut record = self.get(id).await?;
        record.fail(error)?;
        self.persist(&record).await
    }

    /// failed → pending の明示的な再投入。
    pub async fn retry(&self, id: &RecordId) -> Result<(), AppError> {
        let mut record = self.get(id).await?;
        if record.sync_status != SyncStatus::Failed {
            return Err(AppError::InvalidTransition(format!(
                "record {id} is {}, only failed records can be retried",
                record.sync_status
            )));
        }
        record.reset_to_pending()?;
        self.persist(&record).await
    }

    /// syncing のまま取り残されたレコードを pending に戻す。
    /// 前回パスの中断（クラッシュ・切断）からの自己回復。
    pub async fn reset_stale_syncing(&self, older_than: Duration) -> Result<u32, AppError> {
        let cutoff = Utc::now() - older_than;
        let mut healed = 0u32;

        for mut record in self.load_all().await? {
            if record.sync_status == SyncStatus::Syncing && record.updated_at < cutoff {
                record.reset_to_pending()?;
                self.persist(&record).await?;
                healed += 1;
            }
        }

        if healed > 0 {
            tracing::info!(
                target: "sync::queue",
                count = healed,
                "reset stale syncing records to pending"
            );
        }
        Ok(healed)
    }

    /// 保持期間を過ぎた synced レコードを削除する。
    /// pending / failed には決して触れない。
    pub async fn prune(&self, retention: Duration) -> Result<u32, AppError> {
        let cutoff = Utc::now() - retention;
        let mut removed = 0u32;

        for record in self.load_all().await? {
            let expired = record.sync_status == SyncStatus::Synced
                && record.synced_at.is_some_and(|at| at < cutoff);
            if expired {
                self.store
                    .delete(&Namespace::PendingMutations, record.id.as_str())
                    .await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(target: "sync::queue", count = removed, "pruned synced records");
        }
        Ok(removed)
    }

    pub async fn clear_synced(&self) -> Result<u32, AppError> {
        let mut removed = 0u32;
        for record in self.load_all().await? {
            if record.sync_status == SyncStatus::Synced {
                self.store
                    .delete(&Namespace::PendingMutations, record.id.as_str())
                    .await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn count_by_status(&self) -> Result<QueueCounts, AppError> {
        let mut counts = QueueCounts::default();
        for record in self.load_all().await? {
            match record.sync_status {
                SyncStatus::Pending => counts.pending += 1,
                SyncStatus::Syncing => counts.syncing += 1,
                SyncStatus::Failed => counts.failed += 1,
                SyncStatus::Synced => counts.synced += 1,
            }
        }
        Ok(counts)
    }

    async fn load_all(&self) -> Result<Vec<OfflineRecord>, AppError> {
        let keys = self.store.list_keys(&Namespace::PendingMutations).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.get(&Namespace::PendingMutations, &key).await? {
                records.push(serde_json::from_str(&value)?);
            }
        }
        Ok(records)
    }

    async fn persist(&self, record: &OfflineRecord) -> Result<(), AppError> {
        let value = serde_json::to_string(record)?;
        self.store
            .set(&Namespace::PendingMutations, record.id.as_str(), value)
            .await
    }

    fn oldest_evictable(records: &[OfflineRecord]) -> Option<RecordId> {
        Self::oldest_with(records, SyncStatus::Synced)
            .or_else(|| Self::oldest_with(records, SyncStatus::Failed))
    }

    fn oldest_with(records: &[OfflineRecord], status: SyncStatus) -> Option<RecordId> {
        records
            .iter()
            .filter(|r| r.sync_status == status)
            .min_by(|a, b| a.captured_at.cmp(&b.captured_at))
            .map(|r| r.id.clone())
    }

    fn sort_by_capture(records: &mut [OfflineRecord]) {
        records.sort_by(|a, b| {
            a.captured_at
                .cmp(&b.captured_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Operation, RecordPayload, UserId};
    use crate::infrastructure::storage::MemoryLocalStore;
    use serde_json::json;

    fn owner() -> UserId {
        UserId::new("user-1".into()).unwrap()
    }

    fn record(kind: EntityKind, marker: u32) -> OfflineRecord {
        OfflineRecord::capture(
            owner(),
            kind,
            Operation::Create,
            RecordPayload::new(json!({ "marker": marker })).unwrap(),
            None,
        )
    }

    fn queue_with(capacity: usize) -> (PendingMutationQueue, Arc<MemoryLocalStore>) {
        let store = Arc::new(MemoryLocalStore::new());
        (
            PendingMutationQueue::new(store.clone(), capacity),
            store,
        )
    }

    #[tokio::test]
    async fn test_list_pending_ordered_by_captured_at() {
        let (queue, _) = queue_with(100);

        let mut first = record(EntityKind::MoodEntry, 1);
        let mut second = record(EntityKind::MoodEntry, 2);
        first.captured_at = Utc::now() - Duration::minutes(5);
        second.captured_at = Utc::now() - Duration::minutes(1);

        // 逆順に積んでも capturedAt 順で返る
        queue.enqueue(second.clone()).await.unwrap();
        queue.enqueue(first.clone()).await.unwrap();

        let pending = queue.list_pending(None).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[tokio::test]
    async fn test_list_pending_filters_by_entity_kind() {
        let (queue, _) = queue_with(100);
        queue.enqueue(record(EntityKind::MoodEntry, 1)).await.unwrap();
        queue.enqueue(record(EntityKind::Settings, 2)).await.unwrap();

        let moods = queue
            .list_pending(Some(EntityKind::MoodEntry))
            .await
            .unwrap();
        assert_eq!(moods.len(), 1);
        assert_eq!(moods[0].entity_kind, EntityKind::MoodEntry);
    }

    #[tokio::test]
    async fn test_transitions_follow_state_machine() {
        let (queue, _) = queue_with(100);
        let id = queue.enqueue(record(EntityKind::MoodEntry, 1)).await.unwrap();

        // pending のまま synced にはできない
        let err = queue
            .mark_synced(&id, RemoteId::new("r1".into()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        queue.mark_syncing(&id).await.unwrap();
        queue
            .mark_synced(&id, RemoteId::new("r1".into()).unwrap())
            .await
            .unwrap();

        let record = queue.get(&id).await.unwrap();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(record.remote_id.unwrap().as_str(), "r1");
    }

    #[tokio::test]
    async fn test_retry_only_reopens_failed_records() {
        let (queue, _) = queue_with(100);
        let id = queue.enqueue(record(EntityKind::MoodEntry, 1)).await.unwrap();

        assert!(queue.retry(&id).await.is_err());

        queue.mark_syncing(&id).await.unwrap();
        queue.mark_failed(&id, "boom".into()).await.unwrap();
        queue.retry(&id).await.unwrap();

        let record = queue.get(&id).await.unwrap();
        assert_eq!(record.sync_status, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_failed_first() {
        let (queue, _) = queue_with(2);

        let failed_id = queue.enqueue(record(EntityKind::MoodEntry, 1)).await.unwrap();
        queue.mark_syncing(&failed_id).await.unwrap();
        queue.mark_failed(&failed_id, "boom".into()).await.unwrap();
        queue.enqueue(record(EntityKind::MoodEntry, 2)).await.unwrap();

        // 満杯だが failed がいるので追記できる
        queue.enqueue(record(EntityKind::MoodEntry, 3)).await.unwrap();
        assert!(queue.get(&failed_id).await.is_err());

        // pending しか残っていなければ拒否する
        let err = queue
            .enqueue(record(EntityKind::MoodEntry, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueueFull(_)));
    }

    #[tokio::test]
    async fn test_capacity_evicts_synced_before_failed() {
        let (queue, _) = queue_with(2);

        let synced_id = queue.enqueue(record(EntityKind::MoodEntry, 1)).await.unwrap();
        queue.mark_syncing(&synced_id).await.unwrap();
        queue
            .mark_synced(&synced_id, RemoteId::new("r1".into()).unwrap())
            .await
            .unwrap();

        let failed_id = queue.enqueue(record(EntityKind::MoodEntry, 2)).await.unwrap();
        queue.mark_syncing(&failed_id).await.unwrap();
        queue.mark_failed(&failed_id, "boom".into()).await.unwrap();

        // synced がリモートに残っている分から先に追い出される
        queue.enqueue(record(EntityKind::MoodEntry, 3)).await.unwrap();
        assert!(queue.get(&synced_id).await.is_err());
        assert!(queue.get(&failed_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_capacity_full_of_synced_never_rejects_new_work() {
        let (queue, _) = queue_with(2);

        for marker in 1..=2 {
            let id = queue.enqueue(record(EntityKind::MoodEntry, marker)).await.unwrap();
            queue.mark_syncing(&id).await.unwrap();
            queue
                .mark_synced(&id, RemoteId::new(format!("r{marker}")).unwrap())
                .await
                .unwrap();
        }

        // キャップが synced で埋まっていても新しい操作は失わない
        let id = queue.enqueue(record(EntityKind::MoodEntry, 3)).await.unwrap();
        assert_eq!(queue.get(&id).await.unwrap().sync_status, SyncStatus::Pending);

        let counts = queue.count_by_status().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.synced, 1);
    }

    #[tokio::test]
    async fn test_enqueue_replacing_keeps_single_settings_record() {
        let (queue, _) = queue_with(100);

        queue
            .enqueue_replacing(record(EntityKind::Settings, 1))
            .await
            .unwrap();
        let latest = record(EntityKind::Settings, 2);
        let latest_id = latest.id.clone();
        queue.enqueue_replacing(latest).await.unwrap();

        let pending = queue
            .list_pending(Some(EntityKind::Settings))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, latest_id);
        assert_eq!(pending[0].payload.as_json()["marker"], 2);
    }

    #[tokio::test]
    async fn test_prune_never_touches_unsynced_records() {
        let (queue, _) = queue_with(100);

        let mut old_synced = record(EntityKind::MoodEntry, 1);
        old_synced.begin_sync().unwrap();
        old_synced
            .complete(RemoteId::new("r1".into()).unwrap())
            .unwrap();
        old_synced.synced_at = Some(Utc::now() - Duration::days(30));
        queue.enqueue(old_synced).await.unwrap();

        queue.enqueue(record(EntityKind::MoodEntry, 2)).await.unwrap();

        let removed = queue.prune(Duration::days(7)).await.unwrap();
        assert_eq!(removed, 1);

        let counts = queue.count_by_status().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.synced, 0);
    }

    #[tokio::test]
    async fn test_reset_stale_syncing_heals_stuck_records() {
        let (queue, _) = queue_with(100);
        let id = queue.enqueue(record(EntityKind::MoodEntry, 1)).await.unwrap();
        queue.mark_syncing(&id).await.unwrap();

        // まだ新しいので触らない
        assert_eq!(queue.reset_stale_syncing(Duration::seconds(60)).await.unwrap(), 0);

        let mut stuck = queue.get(&id).await.unwrap();
        stuck.updated_at = Utc::now() - Duration::minutes(5);
        let value = serde_json::to_string(&stuck).unwrap();
        queue
            .store
            .set(&Namespace::PendingMutations, id.as_str(), value)
            .await
            .unwrap();

        assert_eq!(queue.reset_stale_syncing(Duration::seconds(60)).await.unwrap(), 1);
        assert_eq!(
            queue.get(&id).await.unwrap().sync_status,
            SyncStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_enqueue_surfaces_storage_failure() {
        let (queue, store) = queue_with(100);
        store.fail_writes(true);

        let err = queue
            .enqueue(record(EntityKind::MoodEntry, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable(_)));
    }
}
