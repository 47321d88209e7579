use crate::application::ports::{ConnectivityMonitor, LocalStore, RemoteEntityStore, RemoteError};
use crate::application::services::mutation_queue::PendingMutationQueue;
use crate::domain::entities::{OfflineRecord, SyncFailure, SyncReport};
use crate::domain::value_objects::{EntityKind, Namespace, Operation, RemoteId};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

#[derive(Default)]
struct LaneOutcome {
    synced: u32,
    failed: u32,
    skipped: u32,
    failures: Vec<SyncFailure>,
}

/// 接続回復時（または手動の「今すぐ同期」）にキューをリモートへ
/// 流し込むリコンシリエータ。
///
/// エンティティ種別ごとのレーンは並行に走るが、レーン内は
/// capturedAt 順の逐次処理で因果順序を守る。パスは開始時点の
/// スナップショットだけを対象にし、ドレイン中の新規エンキューは
/// 次のパスに回る。
pub struct SyncReconciler {
    queue: Arc<PendingMutationQueue>,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteEntityStore>,
    monitor: Arc<dyn ConnectivityMonitor>,
    config: SyncConfig,
    /// パスの多重起動を防ぐゲート
    gate: Mutex<()>,
    last_report: RwLock<Option<SyncReport>>,
}

impl SyncReconciler {
    pub fn new(
        queue: Arc<PendingMutationQueue>,
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteEntityStore>,
        monitor: Arc<dyn ConnectivityMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            queue,
            store,
            remote,
            monitor,
            config,
            gate: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }

    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    /// 1回のリコンシリエーションパス。
    pub async fn run_once(&self) -> Result<SyncReport, AppError> {
        let _guard = self.gate.lock().await;

        if !self.monitor.is_online() {
            // オフラインは正常系。騒がしくログしない。
            tracing::debug!(target: "sync::reconciler", "skipping pass, still offline");
            let report = SyncReport::offline();
            *self.last_report.write().await = Some(report.clone());
            return Ok(report);
        }

        self.queue
            .reset_stale_syncing(chrono::Duration::seconds(self.config.stale_syncing_secs))
            .await?;

        let snapshot = self.queue.list_drainable().await?;
        if snapshot.is_empty() {
            let report = SyncReport::completed(0, 0, 0, Vec::new());
            *self.last_report.write().await = Some(report.clone());
            return Ok(report);
        }

        let mut lanes: BTreeMap<EntityKind, Vec<OfflineRecord>> = BTreeMap::new();
        for record in snapshot {
            lanes.entry(record.entity_kind).or_default().push(record);
        }

        let outcomes = join_all(
            lanes
                .into_values()
                .map(|records| self.drain_lane(records)),
        )
        .await;

        let mut synced = 0u32;
        let mut failed = 0u32;
        let mut skipped = 0u32;
        let mut failures = Vec::new();
        for outcome in outcomes {
            let outcome = outcome?;
            synced += outcome.synced;
            failed += outcome.failed;
            skipped += outcome.skipped;
            failures.extend(outcome.failures);
        }

        let report = SyncReport::completed(synced, failed, skipped, failures);
        tracing::info!(
            target: "sync::reconciler",
            synced = report.synced_count,
            failed = report.failed_count,
            skipped = report.skipped_count,
            "reconciliation pass completed"
        );
        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// 接続の offline → online 遷移でパスを起動するタスク。
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        let mut rx = reconciler.monitor.subscribe();
        // 基準値はタスク起動前に固定する。spawn から初回ポーリングまでの
        // 間に起きた遷移も changed() で拾える。
        let mut was_online = *rx.borrow_and_update();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow();
                if online && !was_online {
                    if let Err(e) = reconciler.run_once().await {
                        tracing::error!(
                            target: "sync::reconciler",
                            error = %e,
                            "auto sync pass failed"
                        );
                    }
                }
                was_online = online;
            }
        })
    }

    /// 定期ドレイン。auto_sync が無効なら何もしないタスクを返す。
    pub fn spawn_periodic(self: &Arc<Self>) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            if !reconciler.config.auto_sync {
                return;
            }
            let mut interval =
                tokio::time::interval(Duration::from_secs(reconciler.config.sync_interval.max(1)));
            // 起動直後の即時発火を捨てる
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = reconciler.run_once().await {
                    tracing::error!(
                        target: "sync::reconciler",
                        error = %e,
                        "periodic sync pass failed"
                    );
                }
            }
        })
    }

    async fn drain_lane(&self, records: Vec<OfflineRecord>) -> Result<LaneOutcome, AppError> {
        let mut outcome = LaneOutcome::default();
        let total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            // 切断されたら新しいレコードには着手しない。残りは次のパスへ。
            if !self.monitor.is_online() {
                outcome.skipped += (total - index) as u32;
                break;
            }

            match self.queue.mark_syncing(&record.id).await {
                Ok(()) => {}
                // スナップショット後に置き換えで消えたレコード。後継の
                // レコードが次のパスで運ばれるので、黙って飛ばす。
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(
                        target: "sync::reconciler",
                        record_id = %record.id,
                        "record replaced during pass, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }

            match self.attempt_remote(&record).await {
                Ok(remote_id) => {
                    self.queue.mark_synced(&record.id, remote_id.clone()).await?;
                    self.cache_synced(&record, &remote_id).await?;
                    outcome.synced += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        target: "sync::reconciler",
                        record_id = %record.id,
                        entity = %record.entity_kind,
                        error = %err,
                        "record failed to sync"
                    );
                    self.queue.mark_failed(&record.id, err.to_string()).await?;
                    outcome.failures.push(SyncFailure {
                        record_id: record.id.clone(),
                        entity_kind: record.entity_kind,
                        reason: err.to_string(),
                    });
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// リモート呼び出し本体。transient のみ指数バックオフで再試行し、
    /// permanent は即座に諦める。タイムアウトは transient 扱い。
    async fn attempt_remote(&self, record: &OfflineRecord) -> Result<RemoteId, RemoteError> {
        let call_timeout = Duration::from_secs(self.config.call_timeout_secs);
        let mut attempt = 0u32;

        loop {
            let result = tokio::time::timeout(call_timeout, self.dispatch(record)).await;
            let err = match result {
                Ok(Ok(remote_id)) => return Ok(remote_id),
                Ok(Err(err)) => err,
                Err(_) => RemoteError::transient(format!(
                    "remote call timed out after {}s",
                    self.config.call_timeout_secs
                )),
            };

            if !err.is_transient() || attempt >= self.config.max_retries {
                return Err(err);
            }

            let backoff =
                Duration::from_secs(self.config.retry_backoff_secs.max(1) << attempt);
            tracing::debug!(
                target: "sync::reconciler",
                record_id = %record.id,
                attempt = attempt + 1,
                backoff_secs = backoff.as_secs(),
                "transient failure, backing off"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn dispatch(&self, record: &OfflineRecord) -> Result<RemoteId, RemoteError> {
        match record.operation {
            Operation::Create => {
                self.remote
                    .create(record.entity_kind, &record.payload)
                    .await
            }
            Operation::Update => match &record.remote_id {
                Some(remote_id) => {
                    self.remote
                        .update(record.entity_kind, remote_id, &record.payload)
                        .await
                }
                // リモートIDが未知の update は create として送る（upsert）
                None => {
                    self.remote
                        .create(record.entity_kind, &record.payload)
                        .await
                }
            },
            Operation::Delete => match &record.remote_id {
                Some(remote_id) => {
                    self.remote.delete(record.entity_kind, remote_id).await?;
                    Ok(remote_id.clone())
                }
                None => Err(RemoteError::permanent(
                    "delete requires a known remote id",
                )),
            },
        }
    }

    /// 同期に成功したペイロードをキャッシュ名前空間へ反映し、
    /// prune 後も readCached が返せるようにする。
    async fn cache_synced(
        &self,
        record: &OfflineRecord,
        remote_id: &RemoteId,
    ) -> Result<(), AppError> {
        let namespace = Namespace::Cache(record.entity_kind);
        match record.operation {
            Operation::Delete => {
                self.store.delete(&namespace, remote_id.as_str()).await
            }
            _ => {
                let value = serde_json::to_string(record.payload.as_json())?;
                self.store.set(&namespace, remote_id.as_str(), value).await
            }
        }
    }
}
