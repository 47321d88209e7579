pub mod entity_kind;
pub mod feature_name;
pub mod namespace;
pub mod operation;
pub mod payload;
pub mod record_id;
pub mod remote_id;
pub mod sync_status;
pub mod user_id;

pub use entity_kind::EntityKind;
pub use feature_name::FeatureName;
pub use namespace::Namespace;
pub use operation::Operation;
pub use payload::RecordPayload;
pub use record_id::RecordId;
pub use remote_id::RemoteId;
pub use sync_status::SyncStatus;
pub use user_id::UserId;
