//! permwatch runtime
//!
//! The actors that keep permission statuses in sync:
//! - Checker/Requester: one provider check or request at a time
//! - Monitor: owns the statuses and fans changes out per permission
//! - Reporting: per-feature subscription and request bridge
//! - Service registry with a readiness handshake

pub mod actor;
pub mod checker;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod reporting;
pub mod testing;

pub use actor::{ActorId, Recipient};
pub use checker::{CheckerEvent, CheckerHandle, CheckerSnapshot, CheckerState, PermissionChecker};
pub use error::ActorError;
pub use monitor::{MonitorHandle, MonitorSnapshot, PermissionMonitor, StatusChanged, Subscriber};
pub use registry::{RegistryError, ServiceRegistry, WellKnownId};
pub use reporting::{PermissionEvent, ReportingActor, ReportingHandle, ReportingInput};
