//! Reporting actor: the per-feature bridge to the monitor.
//!
//! A feature component spawns one of these with the permissions it cares
//! about. The actor subscribes to the monitor on start, forwards permission
//! requests to the checker and relays every status change to the feature as
//! a [`PermissionEvent`].

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use permwatch_core::config::ReportingConfig;
use permwatch_core::{Permission, PermissionStatus};

use crate::actor::{ActorId, Recipient, send_to_parent};
use crate::checker::CheckerHandle;
use crate::error::ActorError;
use crate::monitor::{MonitorHandle, StatusChanged};
use crate::registry::ServiceRegistry;

/// Status change as delivered to a feature component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionEvent {
    pub permission: Permission,
    pub status: PermissionStatus,
}

impl PermissionEvent {
    /// Event name in the form `permissions.<permission>.<status>`.
    pub fn event_type(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PermissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "permissions.{}.{}", self.permission, self.status)
    }
}

impl From<StatusChanged> for PermissionEvent {
    fn from(change: StatusChanged) -> Self {
        Self {
            permission: change.permission,
            status: change.status,
        }
    }
}

/// What a reporting actor is spawned with.
#[derive(Debug, Clone, Default)]
pub struct ReportingInput {
    /// Permissions to subscribe to.
    pub permissions: Vec<Permission>,
    /// Receiver of relayed [`PermissionEvent`]s.
    pub parent: Option<Recipient<PermissionEvent>>,
}

#[derive(Debug)]
enum ReportingMessage {
    RequestPermission(Permission),
    StatusChanged(StatusChanged),
    Stop,
}

/// Reporting actor state. It only ever waits for messages.
pub struct ReportingActor {
    id: ActorId,
    parent: Option<Recipient<PermissionEvent>>,
    monitor: MonitorHandle,
    checker: CheckerHandle,
}

impl ReportingActor {
    /// Spawn with explicit collaborators.
    ///
    /// The subscription is sent before this returns, so it is ordered ahead
    /// of anything the caller sends to the monitor afterwards.
    pub fn spawn(
        input: ReportingInput,
        monitor: MonitorHandle,
        checker: CheckerHandle,
    ) -> Result<ReportingHandle, ActorError> {
        let id = ActorId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        // Weak, so the monitor's subscriber set does not keep this actor alive.
        let subscriber = Recipient::weak_mapped(id, tx.downgrade(), ReportingMessage::StatusChanged);
        monitor.subscribe_to_permission_statuses(&input.permissions, subscriber)?;
        debug!(actor = %id, permissions = ?input.permissions, "Reporting actor subscribed");

        let actor = Self {
            id,
            parent: input.parent,
            monitor,
            checker,
        };
        tokio::spawn(actor.run(rx));
        Ok(ReportingHandle { id, tx })
    }

    /// Spawn once the monitor and checker are registered.
    ///
    /// Each lookup waits at most `config.lookup_timeout()`.
    pub async fn spawn_from_registry(
        input: ReportingInput,
        registry: &ServiceRegistry,
        config: &ReportingConfig,
    ) -> Result<ReportingHandle, ActorError> {
        let timeout = config.lookup_timeout();
        let monitor = registry.wait_for_monitor(timeout).await?;
        let checker = registry.wait_for_checker(timeout).await?;
        Self::spawn(input, monitor, checker)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<ReportingMessage>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                ReportingMessage::RequestPermission(permission) => {
                    debug!(actor = %self.id, %permission, "Forwarding permission request");
                    if let Err(e) = self.checker.trigger_permission_request(permission) {
                        warn!(actor = %self.id, %permission, error = %e, "Checker unreachable");
                    }
                }
                ReportingMessage::StatusChanged(change) => {
                    let event = PermissionEvent::from(change);
                    debug!(actor = %self.id, event = %event, "Relaying permission event");
                    send_to_parent(self.parent.as_ref(), event, self.id);
                }
                ReportingMessage::Stop => break,
            }
        }

        if self.monitor.unsubscribe(self.id).is_err() {
            debug!(actor = %self.id, "Monitor gone, nothing to unsubscribe from");
        }
        debug!(actor = %self.id, "Reporting actor stopped");
    }
}

/// Handle to a running [`ReportingActor`].
///
/// The actor stops, and unsubscribes, when [`stop`](Self::stop) is called or
/// every handle is dropped.
#[derive(Debug, Clone)]
pub struct ReportingHandle {
    id: ActorId,
    tx: mpsc::UnboundedSender<ReportingMessage>,
}

impl ReportingHandle {
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Ask the checker to request `permission`. The result arrives as a
    /// [`PermissionEvent`] if the status changes.
    pub fn request_permission(&self, permission: Permission) -> Result<(), ActorError> {
        self.send(ReportingMessage::RequestPermission(permission))
    }

    pub fn stop(&self) {
        if self.send(ReportingMessage::Stop).is_err() {
            debug!(actor = %self.id, "Reporting actor already stopped");
        }
    }

    fn send(&self, msg: ReportingMessage) -> Result<(), ActorError> {
        self.tx
            .send(msg)
            .map_err(|_| ActorError::MailboxClosed { actor: self.id })
    }
}
