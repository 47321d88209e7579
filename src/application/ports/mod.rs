pub mod connectivity;
pub mod local_store;
pub mod remote_store;

pub use connectivity::ConnectivityMonitor;
pub use local_store::LocalStore;
pub use remote_store::{RemoteEntityStore, RemoteError, RemoteErrorKind};
