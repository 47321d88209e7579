use crate::application::ports::{ConnectivityMonitor, LocalStore, RemoteEntityStore};
use crate::application::services::feature_adapter::remote_error_to_app;
use crate::application::services::mutation_queue::PendingMutationQueue;
use crate::domain::entities::{OfflineRecord, SettingsSnapshot};
use crate::domain::value_objects::{
    EntityKind, Namespace, Operation, RecordPayload, RemoteId, UserId,
};
use crate::shared::error::AppError;
use std::sync::Arc;

const SNAPSHOT_KEY: &str = "current";
const REMOTE_ID_KEY: &str = "remote_id";
const STREAM_KEY: &str = "settings";

/// 設定スナップショットのローカルファースト保存。
///
/// 書き込みはまずローカルに落とし、その後リモートへ反映する。
/// キューには同一ストリームの pending を1件しか残さない
/// （最後のローカル書き込みが勝つ）。
pub struct SettingsService {
    store: Arc<dyn LocalStore>,
    queue: Arc<PendingMutationQueue>,
    remote: Arc<dyn RemoteEntityStore>,
    monitor: Arc<dyn ConnectivityMonitor>,
}

impl SettingsService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<PendingMutationQueue>,
        remote: Arc<dyn RemoteEntityStore>,
        monitor: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            store,
            queue,
            remote,
            monitor,
        }
    }

    /// ローカルの設定。まだ何も保存されていなければ既定値。
    pub async fn load(&self) -> Result<SettingsSnapshot, AppError> {
        match self.store.get(&Namespace::Settings, SNAPSHOT_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SettingsSnapshot::default()),
        }
    }

    /// 保存。ローカル書き込みが成功すれば呼び出し元には成功を返す。
    /// リモート反映はオンラインなら即時、オフライン（または一時障害）
    /// なら置き換えエンキューで後回しにする。
    pub async fn save(
        &self,
        owner: &UserId,
        snapshot: &SettingsSnapshot,
    ) -> Result<(), AppError> {
        let raw = serde_json::to_string(snapshot)?;
        self.store
            .set(&Namespace::Settings, SNAPSHOT_KEY, raw)
            .await?;

        let payload =
            RecordPayload::from_serialize(snapshot).map_err(AppError::ValidationError)?;
        let remote_id = self.known_remote_id(owner).await?;

        if self.monitor.is_online() {
            match self.push_remote(&payload, remote_id.as_ref()).await {
                Ok(assigned) => {
                    self.remember_remote_id(&assigned).await?;
                    return Ok(());
                }
                Err(AppError::TransientRemote(reason)) => {
                    tracing::debug!(
                        target: "sync::settings",
                        error = %reason,
                        "remote save deferred to queue"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        let record = OfflineRecord::capture(
            owner.clone(),
            EntityKind::Settings,
            Operation::Update,
            payload,
            remote_id,
        )
        .with_stream_key(STREAM_KEY);
        self.queue.enqueue_replacing(record).await?;
        Ok(())
    }

    async fn push_remote(
        &self,
        payload: &RecordPayload,
        remote_id: Option<&RemoteId>,
    ) -> Result<RemoteId, AppError> {
        let result = match remote_id {
            Some(id) => self.remote.update(EntityKind::Settings, id, payload).await,
            None => self.remote.create(EntityKind::Settings, payload).await,
        };
        result.map_err(remote_error_to_app)
    }

    /// 既知のリモートID。ローカルキャッシュ優先、なければ同期済み
    /// キューから復元してキャッシュする。
    async fn known_remote_id(&self, owner: &UserId) -> Result<Option<RemoteId>, AppError> {
        if let Some(raw) = self.store.get(&Namespace::Settings, REMOTE_ID_KEY).await? {
            return Ok(Some(RemoteId::new(raw).map_err(AppError::ValidationError)?));
        }
        let recovered = self
            .queue
            .latest_synced_remote_id(EntityKind::Settings, owner, Some(STREAM_KEY))
            .await?;
        if let Some(id) = &recovered {
            self.remember_remote_id(id).await?;
        }
        Ok(recovered)
    }

    async fn remember_remote_id(&self, remote_id: &RemoteId) -> Result<(), AppError> {
        self.store
            .set(
                &Namespace::Settings,
                REMOTE_ID_KEY,
                remote_id.as_str().to_string(),
            )
            .await
    }
}
