use crate::application::ports::{
    ConnectivityMonitor, LocalStore, RemoteEntityStore, RemoteError, RemoteErrorKind,
};
use crate::application::services::mutation_queue::PendingMutationQueue;
use crate::domain::entities::OfflineRecord;
use crate::domain::value_objects::{
    EntityKind, Namespace, Operation, RecordId, RecordPayload, RemoteId, UserId,
};
use crate::shared::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// save の結果。呼び出し側（UI）はどちらのケースをどう描画するかを
/// 必ず自分で決める。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// リモートへ直接保存された
    Synced(RemoteId),
    /// オフラインのためキューに積まれた
    Queued(RecordId),
}

impl SaveOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SaveOutcome::Queued(_))
    }
}

pub(crate) fn remote_error_to_app(err: RemoteError) -> AppError {
    match err.kind {
        RemoteErrorKind::Transient => AppError::TransientRemote(err.message),
        RemoteErrorKind::Permanent => AppError::PermanentRemote(err.message),
    }
}

/// オンライン/オフライン分岐を隠す機能アダプタの共通部。
/// 追記型ストリーム（気分記録など）のための create + キャッシュ読み。
pub struct FeatureAdapter {
    kind: EntityKind,
    store: Arc<dyn LocalStore>,
    queue: Arc<PendingMutationQueue>,
    remote: Arc<dyn RemoteEntityStore>,
    monitor: Arc<dyn ConnectivityMonitor>,
}

impl FeatureAdapter {
    pub fn new(
        kind: EntityKind,
        store: Arc<dyn LocalStore>,
        queue: Arc<PendingMutationQueue>,
        remote: Arc<dyn RemoteEntityStore>,
        monitor: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            kind,
            store,
            queue,
            remote,
            monitor,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.kind
    }

    /// オンラインならリモートへ直接 create し、結果をキャッシュへ反映。
    /// オフラインならスナップショットをキューに積む。どちらの場合も
    /// 戻った時点で readCached から見える。
    pub async fn save<T: Serialize>(
        &self,
        owner: &UserId,
        value: &T,
    ) -> Result<SaveOutcome, AppError> {
        let payload =
            RecordPayload::from_serialize(value).map_err(AppError::ValidationError)?;

        if self.monitor.is_online() {
            let remote_id = self
                .remote
                .create(self.kind, &payload)
                .await
                .map_err(remote_error_to_app)?;
            let cached = serde_json::to_string(payload.as_json())?;
            self.store
                .set(&Namespace::Cache(self.kind), remote_id.as_str(), cached)
                .await?;
            return Ok(SaveOutcome::Synced(remote_id));
        }

        let record = OfflineRecord::capture(
            owner.clone(),
            self.kind,
            Operation::Create,
            payload,
            None,
        );
        let id = self.queue.enqueue(record).await?;
        Ok(SaveOutcome::Queued(id))
    }

    /// ローカルにあるものだけを返す。ネットワークは待たない。
    /// 同期済みキャッシュに未同期のキュー分を重ねた楽観ビュー。
    ///
    /// キャッシュ名前空間は端末の現在ユーザーの同期結果だけを持ち、
    /// ペイロードに所有者は埋め込まれない。owner でのフィルタは
    /// 所有者を記録しているキュー側にのみ掛かる。
    pub async fn read_cached<T: DeserializeOwned>(
        &self,
        owner: &UserId,
    ) -> Result<Vec<T>, AppError> {
        let namespace = Namespace::Cache(self.kind);
        let mut values = Vec::new();

        for key in self.store.list_keys(&namespace).await? {
            let Some(raw) = self.store.get(&namespace, &key).await? else {
                continue;
            };
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::warn!(
                        target: "sync::adapter",
                        entity = %self.kind,
                        key = %key,
                        error = %e,
                        "skipping undecodable cache entry"
                    );
                }
            }
        }

        for record in self.queue.list_unsynced(Some(self.kind)).await? {
            if record.owner != *owner {
                continue;
            }
            match serde_json::from_value::<T>(record.payload.as_json().clone()) {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::warn!(
                        target: "sync::adapter",
                        entity = %self.kind,
                        record_id = %record.id,
                        error = %e,
                        "skipping undecodable queued payload"
                    );
                }
            }
        }

        Ok(values)
    }
}
