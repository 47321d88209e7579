pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::MemoryLocalStore;
pub use sqlite_store::SqliteLocalStore;
