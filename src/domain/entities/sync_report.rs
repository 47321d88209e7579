use crate::domain::value_objects::{EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const OFFLINE_REASON: &str = "offline";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncFailure {
    pub record_id: RecordId,
    pub entity_kind: EntityKind,
    pub reason: String,
}

/// 1回のリコンシリエーションパスの結果概要。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncReport {
    pub success: bool,
    /// オフラインのまま終わった場合は "offline"。エラーではなく通常の結果。
    pub reason: Option<String>,
    pub synced_count: u32,
    pub failed_count: u32,
    /// 途中でオフラインに戻ったため処理しなかった件数
    pub skipped_count: u32,
    pub failures: Vec<SyncFailure>,
    pub completed_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn offline() -> Self {
        Self {
            success: false,
            reason: Some(OFFLINE_REASON.to_string()),
            synced_count: 0,
            failed_count: 0,
            skipped_count: 0,
            failures: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn completed(
        synced_count: u32,
        failed_count: u32,
        skipped_count: u32,
        failures: Vec<SyncFailure>,
    ) -> Self {
        Self {
            success: failed_count == 0,
            reason: None,
            synced_count,
            failed_count,
            skipped_count,
            failures,
            completed_at: Utc::now(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.reason.as_deref() == Some(OFFLINE_REASON)
    }
}
