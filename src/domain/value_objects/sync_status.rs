use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }

    /// synced は不変（終端）。failed からは明示的なリトライでのみ
    /// pending に戻れる。
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Synced)
                | (SyncStatus::Syncing, SyncStatus::Failed)
                | (SyncStatus::Syncing, SyncStatus::Pending)
                | (SyncStatus::Failed, SyncStatus::Pending)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }

    pub fn is_unsynced(&self) -> bool {
        matches!(
            self,
            SyncStatus::Pending | SyncStatus::Syncing | SyncStatus::Failed
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for SyncStatus {
    fn from(value: &str) -> Self {
        match value {
            "syncing" => SyncStatus::Syncing,
            "synced" => SyncStatus::Synced,
            "failed" => SyncStatus::Failed,
            _ => SyncStatus::Pending,
        }
    }
}
