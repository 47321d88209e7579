pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{
    ConnectivityMonitor, LocalStore, RemoteEntityStore, RemoteError, RemoteErrorKind,
};
pub use application::services::{
    MoodEntryService, OfflineDataService, PendingMutationQueue, QueueCounts, SaveOutcome,
    SettingsService, SyncReconciler, TutorialProgressService,
};
pub use domain::entities::{
    MoodEntry, OfflineRecord, SettingsSnapshot, StorageInfo, SyncFailure, SyncReport,
    TutorialProgress,
};
pub use domain::value_objects::{
    EntityKind, FeatureName, Namespace, Operation, RecordId, RecordPayload, RemoteId, SyncStatus,
    UserId,
};
pub use shared::config::AppConfig;
pub use shared::error::{AppError, Result};

/// ログ設定の初期化
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensehub_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
