//! Permission monitor: the single owner of permission statuses.
//!
//! The monitor runs an initial check on start, keeps one subscriber set per
//! permission and broadcasts [`StatusChanged`] to a permission's set only
//! when that permission's status actually changes.

mod actor;
mod state;
mod types;

pub use actor::{MonitorHandle, PermissionMonitor};
pub use state::{LifecycleEvent, LifecycleState, MonitorRegions};
pub use types::{MonitorSnapshot, StatusChanged, Subscriber};
