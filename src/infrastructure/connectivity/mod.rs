pub mod debounced_monitor;
pub mod manual_monitor;

pub use debounced_monitor::{DebouncedMonitor, ReachabilityProbe};
pub use manual_monitor::ManualMonitor;
