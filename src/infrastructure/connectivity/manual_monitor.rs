use crate::application::ports::ConnectivityMonitor;
use tokio::sync::watch;

/// 到達性を外部から直接切り替えるモニタ。テストと、プラットフォームが
/// 接続状態を自前で通知してくる埋め込み環境で使う。
pub struct ManualMonitor {
    tx: watch::Sender<bool>,
}

impl ManualMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

impl ConnectivityMonitor for ManualMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
