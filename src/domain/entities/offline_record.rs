use crate::domain::value_objects::{
    EntityKind, Operation, RecordId, RecordPayload, RemoteId, SyncStatus, UserId,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 保留中のミューテーション1件。
///
/// payload はエンキュー時のスナップショットであり不変。状態遷移は
/// `SyncStatus::can_transition_to` が許すものだけを受け付ける。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineRecord {
    pub id: RecordId,
    pub owner: UserId,
    pub entity_kind: EntityKind,
    pub operation: Operation,
    pub payload: RecordPayload,
    /// update の場合は既知のリモートID。create は同期成功時に付与される。
    pub remote_id: Option<RemoteId>,
    /// 同一論理ストリーム（例: 設定スナップショット、機能ごとの
    /// チュートリアル進捗）を識別するキー。置き換えエンキューで使う。
    pub stream_key: Option<String>,
    pub sync_status: SyncStatus,
    pub captured_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl OfflineRecord {
    pub fn capture(
        owner: UserId,
        entity_kind: EntityKind,
        operation: Operation,
        payload: RecordPayload,
        remote_id: Option<RemoteId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            owner,
            entity_kind,
            operation,
            payload,
            remote_id,
            stream_key: None,
            sync_status: SyncStatus::Pending,
            captured_at: now,
            updated_at: now,
            synced_at: None,
            last_error: None,
        }
    }

    pub fn with_stream_key(mut self, stream_key: impl Into<String>) -> Self {
        self.stream_key = Some(stream_key.into());
        self
    }

    pub fn begin_sync(&mut self) -> Result<(), AppError> {
        self.transition(SyncStatus::Syncing)
    }

    pub fn complete(&mut self, remote_id: RemoteId) -> Result<(), AppError> {
        self.transition(SyncStatus::Synced)?;
        self.remote_id = Some(remote_id);
        self.synced_at = Some(Utc::now());
        self.last_error = None;
        Ok(())
    }

    pub fn fail(&mut self, error: String) -> Result<(), AppError> {
        self.transition(SyncStatus::Failed)?;
        self.last_error = Some(error);
        Ok(())
    }

    /// failed → pending の明示的な再投入、および取り残された
    /// syncing レコードの復旧に使う。
    pub fn reset_to_pending(&mut self) -> Result<(), AppError> {
        self.transition(SyncStatus::Pending)
    }

    fn transition(&mut self, next: SyncStatus) -> Result<(), AppError> {
        if !self.sync_status.can_transition_to(next) {
            return Err(AppError::InvalidTransition(format!(
                "record {} cannot move {} -> {}",
                self.id, self.sync_status, next
            )));
        }
        self.sync_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> OfflineRecord {
        OfflineRecord::capture(
            UserId::new("user-1".into()).unwrap(),
            EntityKind::MoodEntry,
            Operation::Create,
            RecordPayload::new(json!({"mood": "low"})).unwrap(),
            None,
        )
    }

    #[test]
    fn test_capture_starts_pending() {
        let record = sample_record();
        assert_eq!(record.sync_status, SyncStatus::Pending);
        assert!(record.remote_id.is_none());
        assert!(record.last_error.is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut record = sample_record();
        record.begin_sync().unwrap();
        record
            .complete(RemoteId::new("remote-1".into()).unwrap())
            .unwrap();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert!(record.synced_at.is_some());
        assert_eq!(record.remote_id.as_ref().unwrap().as_str(), "remote-1");
    }

    #[test]
    fn test_synced_record_rejects_further_transitions() {
        let mut record = sample_record();
        record.begin_sync().unwrap();
        record
            .complete(RemoteId::new("remote-1".into()).unwrap())
            .unwrap();
        assert!(record.begin_sync().is_err());
        assert!(record.reset_to_pending().is_err());
    }

    #[test]
    fn test_failed_record_keeps_error_until_retry_succeeds() {
        let mut record = sample_record();
        record.begin_sync().unwrap();
        record.fail("validation failed".into()).unwrap();
        assert_eq!(record.last_error.as_deref(), Some("validation failed"));

        record.reset_to_pending().unwrap();
        record.begin_sync().unwrap();
        record
            .complete(RemoteId::new("remote-2".into()).unwrap())
            .unwrap();
        assert!(record.last_error.is_none());
    }
}
