use crate::application::ports::{ConnectivityMonitor, LocalStore, RemoteEntityStore};
use crate::application::services::feature_adapter::remote_error_to_app;
use crate::application::services::mutation_queue::PendingMutationQueue;
use crate::domain::entities::{OfflineRecord, TutorialProgress};
use crate::domain::value_objects::{
    EntityKind, FeatureName, Namespace, Operation, RecordPayload, RemoteId, UserId,
};
use crate::shared::error::AppError;
use std::sync::Arc;

const PROGRESS_KEY: &str = "progress";
const REMOTE_ID_KEY: &str = "remote_id";

/// 機能ごとのチュートリアル進捗。進捗は機能単位の独立した
/// ストリームで、ローカル書き込み後にリモートへ upsert される。
pub struct TutorialProgressService {
    store: Arc<dyn LocalStore>,
    queue: Arc<PendingMutationQueue>,
    remote: Arc<dyn RemoteEntityStore>,
    monitor: Arc<dyn ConnectivityMonitor>,
}

impl TutorialProgressService {
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

    pub async fn load(&self, feature: &FeatureName) -> Result<TutorialProgress, AppError> {
        let namespace = Namespace::Tutorial(feature.clone());
        match self.store.get(&namespace, PROGRESS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(TutorialProgress::start(feature.clone())),
        }
    }

    /// 完了・スキップ済みの機能は再表示しない。
    pub async fn should_show(&self, feature: &FeatureName) -> Result<bool, AppError> {
        Ok(!self.load(feature).await?.is_closed())
    }

    /// ステップ完了。閉じた進捗には何もしない（UI側の二重発火対策）。
    pub async fn record_step(
        &self,
        owner: &UserId,
        feature: &FeatureName,
        step_id: &str,
        total_steps: usize,
    ) -> Result<TutorialProgress, AppError> {
        let mut progress = self.load(feature).await?;
        if progress.is_closed() {
            return Ok(progress);
        }
        progress.record_step(step_id, total_steps);
        self.persist_and_push(owner, feature, &progress).await?;
        Ok(progress)
    }

    pub async fn complete(
        &self,
        owner: &UserId,
        feature: &FeatureName,
        all_step_ids: Vec<String>,
    ) -> Result<TutorialProgress, AppError> {
        let mut progress = self.load(feature).await?;
        progress.complete(all_step_ids);
        self.persist_and_push(owner, feature, &progress).await?;
        Ok(progress)
    }

    pub async fn skip(
        &self,
        owner: &UserId,
        feature: &FeatureName,
    ) -> Result<TutorialProgress, AppError> {
        let mut progress = self.load(feature).await?;
        if progress.is_closed() {
            return Ok(progress);
        }
        progress.skip();
        self.persist_and_push(owner, feature, &progress).await?;
        Ok(progress)
    }

    /// ローカルに保存してからリモートへ。オフラインと一時障害は
    /// 置き換えエンキューに退避する（進捗は常に最新1件だけ積む）。
    async fn persist_and_push(
        &self,
        owner: &UserId,
        feature: &FeatureName,
        progress: &TutorialProgress,
    ) -> Result<(), AppError> {
        let namespace = Namespace::Tutorial(feature.clone());
        let raw = serde_json::to_string(progress)?;
        self.store.set(&namespace, PROGRESS_KEY, raw).await?;

        let payload =
            RecordPayload::from_serialize(progress).map_err(AppError::ValidationError)?;
        let remote_id = self.known_remote_id(owner, feature).await?;

        if self.monitor.is_online() {
            let result = match &remote_id {
                Some(id) => {
                    self.remote
                        .update(EntityKind::TutorialProgress, id, &payload)
                        .await
                }
                None => {
                    self.remote
                        .create(EntityKind::TutorialProgress, &payload)
                        .await
                }
            };
            match result.map_err(remote_error_to_app) {
                Ok(assigned) => {
                    self.store
                        .set(&namespace, REMOTE_ID_KEY, assigned.as_str().to_string())
                        .await?;
                    return Ok(());
                }
                Err(AppError::TransientRemote(reason)) => {
                    tracing::debug!(
                        target: "sync::tutorial",
                        feature = %feature,
                        error = %reason,
                        "remote push deferred to queue"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        let record = OfflineRecord::capture(
            owner.clone(),
            EntityKind::TutorialProgress,
            Operation::Update,
            payload,
            remote_id,
        )
        .with_stream_key(Self::stream_key(feature));
        self.queue.enqueue_replacing(record).await?;
        Ok(())
    }

    async fn known_remote_id(
        &self,
        owner: &UserId,
        feature: &FeatureName,
    ) -> Result<Option<RemoteId>, AppError> {
        let namespace = Namespace::Tutorial(feature.clone());
        if let Some(raw) = self.store.get(&namespace, REMOTE_ID_KEY).await? {
            return Ok(Some(RemoteId::new(raw).map_err(AppError::ValidationError)?));
        }
        let recovered = self
            .queue
            .latest_synced_remote_id(
                EntityKind::TutorialProgress,
                owner,
                Some(Self::stream_key(feature).as_str()),
            )
            .await?;
        if let Some(id) = &recovered {
            self.store
                .set(&namespace, REMOTE_ID_KEY, id.as_str().to_string())
                .await?;
        }
        Ok(recovered)
    }

    fn stream_key(feature: &FeatureName) -> String {
        format!("tutorial:{feature}")
    }
}
