//! Monitor protocol types.

use std::collections::BTreeMap;

use tokio::sync::oneshot;

use permwatch_core::{Permission, PermissionStatus, PermissionStatusMap};

use super::state::{LifecycleEvent, LifecycleState};
use crate::actor::{ActorId, Recipient};
use crate::checker::CheckerEvent;

/// Broadcast to subscribers when a permission's status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChanged {
    pub permission: Permission,
    pub status: PermissionStatus,
}

/// An actor registered for status changes.
pub type Subscriber = Recipient<StatusChanged>;

/// Point-in-time view of the monitor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub lifecycle: LifecycleState,
    pub permissions: PermissionStatusMap,
    pub subscribers: BTreeMap<Permission, Vec<ActorId>>,
    /// Provider checks and requests that failed or timed out.
    pub failed_operations: u64,
}

impl MonitorSnapshot {
    pub fn status(&self, permission: Permission) -> PermissionStatus {
        self.permissions.get(permission)
    }

    pub fn subscriber_count(&self, permission: Permission) -> usize {
        self.subscribers.get(&permission).map_or(0, Vec::len)
    }
}

#[derive(Debug)]
pub(crate) enum MonitorMessage {
    Subscribe {
        permissions: Vec<Permission>,
        subscriber: Subscriber,
    },
    Unsubscribe(ActorId),
    TriggerPermissionCheck,
    TriggerPermissionRequest(Permission),
    PermissionsChecked(PermissionStatusMap),
    PermissionRequestCompleted {
        permission: Permission,
        status: PermissionStatus,
    },
    /// The embedded checker could not complete a provider call.
    ProviderFailed {
        permission: Option<Permission>,
        reason: String,
    },
    Lifecycle(LifecycleEvent),
    Snapshot(oneshot::Sender<MonitorSnapshot>),
    Stop,
}

impl From<CheckerEvent> for MonitorMessage {
    fn from(event: CheckerEvent) -> Self {
        match event {
            CheckerEvent::AllPermissionsChecked { statuses } => Self::PermissionsChecked(statuses),
            CheckerEvent::PermissionRequestCompleted { permission, status } => {
                Self::PermissionRequestCompleted { permission, status }
            }
            CheckerEvent::CheckFailed { reason } => Self::ProviderFailed {
                permission: None,
                reason,
            },
            CheckerEvent::RequestFailed { permission, reason } => Self::ProviderFailed {
                permission: Some(permission),
                reason,
            },
        }
    }
}
