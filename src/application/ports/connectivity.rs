use tokio::sync::watch;

/// ネットワーク到達性の現在値と遷移の購読。
///
/// 実装はフラッピング対策のデバウンスと「シグナルが取れない場合は
/// 楽観的にオンライン扱い」の方針をここに集約する。機能側に
/// `if is_online` 判定を散らばらせない。
pub trait ConnectivityMonitor: Send + Sync {
    fn is_online(&self) -> bool;

    /// 遷移の購読。受信側は `changed().await` で次の遷移を待てる。
    fn subscribe(&self) -> watch::Receiver<bool>;
}
