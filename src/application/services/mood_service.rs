use crate::application::ports::{ConnectivityMonitor, LocalStore, RemoteEntityStore};
use crate::application::services::feature_adapter::{FeatureAdapter, SaveOutcome};
use crate::application::services::mutation_queue::PendingMutationQueue;
use crate::domain::entities::MoodEntry;
use crate::domain::value_objects::{EntityKind, UserId};
use crate::shared::error::AppError;
use std::sync::Arc;

/// 気分記録の保存・閲覧。追記専用ストリームなのでアダプタを
/// ほぼ素通しする薄い層。
pub struct MoodEntryService {
    adapter: FeatureAdapter,
}

impl MoodEntryService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<PendingMutationQueue>,
        remote: Arc<dyn RemoteEntityStore>,
        monitor: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            adapter: FeatureAdapter::new(EntityKind::MoodEntry, store, queue, remote, monitor),
        }
    }

    /// 保存。オフラインでも成功を返し、エントリは後から同期される。
    pub async fn save(&self, owner: &UserId, entry: &MoodEntry) -> Result<SaveOutcome, AppError> {
        let outcome = self.adapter.save(owner, entry).await?;
        if outcome.is_queued() {
            tracing::debug!(target: "sync::mood", "mood entry captured offline");
        }
        Ok(outcome)
    }

    /// ローカルで見えている履歴（同期済みキャッシュ + 未同期キュー分）。
    pub async fn history(&self, owner: &UserId) -> Result<Vec<MoodEntry>, AppError> {
        self.adapter.read_cached(owner).await
    }
}
