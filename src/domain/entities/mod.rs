pub mod mood_entry;
pub mod offline_record;
pub mod settings;
pub mod storage_info;
pub mod sync_report;
pub mod tutorial_progress;

pub use mood_entry::MoodEntry;
pub use offline_record::OfflineRecord;
pub use settings::SettingsSnapshot;
pub use storage_info::StorageInfo;
pub use sync_report::{SyncFailure, SyncReport};
pub use tutorial_progress::TutorialProgress;
