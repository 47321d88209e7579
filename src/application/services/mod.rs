pub mod feature_adapter;
pub mod mood_service;
pub mod mutation_queue;
pub mod offline_data;
pub mod reconciler;
pub mod settings_service;
pub mod tutorial_service;

pub use feature_adapter::{FeatureAdapter, SaveOutcome};
pub use mood_service::MoodEntryService;
pub use mutation_queue::{PendingMutationQueue, QueueCounts};
pub use offline_data::OfflineDataService;
pub use reconciler::SyncReconciler;
pub use settings_service::SettingsService;
pub use tutorial_service::TutorialProgressService;
