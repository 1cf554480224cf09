//! Checker/Requester types.

use permwatch_core::{Permission, PermissionStatus, PermissionStatusMap};

/// Observable state of the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckerState {
    #[default]
    Idle,
    /// A check-all call is in flight.
    CheckingPermission,
    /// A request-one call for this permission is in flight.
    RequestingPermission(Permission),
}

impl CheckerState {
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// State plus the statuses the checker last observed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckerSnapshot {
    pub state: CheckerState,
    pub statuses: PermissionStatusMap,
    /// Provider calls finished so far, successful or not.
    pub completed_operations: u64,
}

/// Events the checker reports to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerEvent {
    AllPermissionsChecked {
        statuses: PermissionStatusMap,
    },
    PermissionRequestCompleted {
        permission: Permission,
        status: PermissionStatus,
    },
    /// The provider failed or timed out during a check.
    CheckFailed {
        reason: String,
    },
    /// The provider failed or timed out during a request.
    RequestFailed {
        permission: Permission,
        reason: String,
    },
}

#[derive(Debug)]
pub(crate) enum CheckerMessage {
    TriggerPermissionCheck,
    TriggerPermissionRequest(Permission),
    /// A provider call finished. `operation` ties it to the call that was
    /// started.
    Completed {
        operation: u64,
        outcome: Outcome,
    },
    Stop,
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Checked(Result<PermissionStatusMap, String>),
    Requested(Permission, Result<PermissionStatus, String>),
}
