use crate::domain::value_objects::Namespace;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// 端末側の名前空間付きKVストア。値はシリアライズ済み文字列で、
/// ストア自体は中身を解釈しない。
///
/// 同一名前空間内の書き込みは直列化され、UIイベントハンドラと
/// バックグラウンド同期が交錯してもレコードは壊れない。
/// 書き込み失敗は `AppError::StorageUnavailable` として呼び出し元へ
/// 伝播する（キュー書き込みで握り潰すとユーザー操作が消失する）。
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, namespace: &Namespace, key: &str, value: String) -> Result<(), AppError>;
    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<(), AppError>;
    /// その時点のキー一覧。呼び出しごとに読み直す。
    async fn list_keys(&self, namespace: &Namespace) -> Result<Vec<String>, AppError>;
    async fn size_estimate(&self) -> Result<u64, AppError>;
    /// 名前空間を丸ごと削除し、消した件数を返す。
    async fn clear_namespace(&self, namespace: &Namespace) -> Result<u64, AppError>;
}
