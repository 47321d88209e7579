use serde::{Deserialize, Serialize};

/// 表示用に都度計算されるストレージ概況。永続化はしない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageInfo {
    pub total_bytes: u64,
    /// 未同期（pending / syncing / failed）の件数
    pub pending_items: u64,
    /// 同期済みスナップショットとキャッシュ済みエントリの件数
    pub cached_items: u64,
}
