use crate::application::ports::ConnectivityMonitor;
use crate::shared::config::ConnectivityConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// プラットフォームの到達性シグナル。`None` はシグナルが取得できない
/// 状態を表し、モニタは楽観的にオンライン扱いにする。
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self) -> Option<bool>;
}

/// 到達性をポーリングし、安定ウィンドウ（既定500ms）を満たした遷移
/// だけを publish するモニタ。瞬断で同期が連打されるのを防ぐ。
pub struct DebouncedMonitor {
    tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl DebouncedMonitor {
    pub fn spawn(probe: Arc<dyn ReachabilityProbe>, config: ConnectivityConfig) -> Arc<Self> {
        // 起動直後はシグナル未確定なのでオンラインから始める
        let (tx, _) = watch::channel(true);
        let task_tx = tx.clone();
        let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));
        let debounce = Duration::from_millis(config.debounce_ms);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            let mut candidate: Option<(bool, Instant)> = None;

            loop {
                interval.tick().await;

                let reading = probe.check().await.unwrap_or(true);
                let published = *task_tx.borrow();

                if reading == published {
                    candidate = None;
                    continue;
                }

                match candidate {
                    Some((value, since)) if value == reading => {
                        if since.elapsed() >= debounce {
                            tracing::info!(
                                target: "sync::connectivity",
                                online = reading,
                                "connectivity transition"
                            );
                            task_tx.send_replace(reading);
                            candidate = None;
                        }
                    }
                    _ => {
                        candidate = Some((reading, Instant::now()));
                    }
                }
            }
        });

        Arc::new(Self { tx, handle })
    }
}

impl ConnectivityMonitor for DebouncedMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Drop for DebouncedMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
