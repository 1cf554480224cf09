//! Checker/Requester actor.
//!
//! Performs one batched check or one single-permission request at a time
//! against a [`PermissionProvider`](permwatch_core::PermissionProvider) and
//! reports the outcome to the parent it was spawned with. The monitor owns
//! one as its private worker; any component may spawn its own for ad-hoc
//! checks.

mod actor;
mod types;

pub use actor::{CheckerHandle, PermissionChecker};
pub use types::{CheckerEvent, CheckerSnapshot, CheckerState};
