//! Permission monitor actor loop and handle.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use permwatch_core::{Config, Permission, PermissionProvider, PermissionStatus, PermissionStatusMap};

use super::state::{LifecycleEvent, LifecycleState, MonitorRegions, SubscriberIndex};
use super::types::{MonitorMessage, MonitorSnapshot, StatusChanged, Subscriber};
use crate::actor::{ActorId, Recipient};
use crate::checker::{CheckerEvent, CheckerHandle, PermissionChecker};
use crate::error::ActorError;
use crate::registry::ServiceRegistry;

/// Long-lived actor owning the authoritative permission statuses.
///
/// Embeds a [`PermissionChecker`] for provider access and fans each status
/// change out to the subscribers of that permission only.
pub struct PermissionMonitor {
    id: ActorId,
    regions: MonitorRegions,
    permissions: PermissionStatusMap,
    subscribers: SubscriberIndex,
    checker: CheckerHandle,
    recheck_on_foreground: bool,
    failed_operations: u64,
}

impl PermissionMonitor {
    /// Spawn a monitor and its checker.
    pub fn spawn(provider: Arc<dyn PermissionProvider>, config: &Config) -> MonitorHandle {
        let (actor, handle, rx) = Self::build(provider, config);
        tokio::spawn(actor.run(rx));
        handle
    }

    /// Spawn a monitor and register it, with its checker, in `registry`.
    ///
    /// Registration happens before the actor starts, so anything waiting on
    /// the registry sees a monitor that has not yet processed a message.
    pub fn spawn_registered(
        provider: Arc<dyn PermissionProvider>,
        config: &Config,
        registry: &ServiceRegistry,
    ) -> Result<MonitorHandle, ActorError> {
        let (actor, handle, rx) = Self::build(provider, config);
        if let Err(e) = registry.register_monitoring(&handle) {
            handle.checker.stop();
            return Err(e.into());
        }
        tokio::spawn(actor.run(rx));
        Ok(handle)
    }

    fn build(
        provider: Arc<dyn PermissionProvider>,
        config: &Config,
    ) -> (Self, MonitorHandle, mpsc::UnboundedReceiver<MonitorMessage>) {
        let id = ActorId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        // Weak, so the checker does not keep the monitor's mailbox open.
        let parent: Recipient<CheckerEvent> =
            Recipient::weak_mapped(id, tx.downgrade(), MonitorMessage::from);
        let checker = PermissionChecker::spawn(provider, Some(parent), &config.checker);

        let actor = Self {
            id,
            regions: MonitorRegions::default(),
            permissions: PermissionStatusMap::new(),
            subscribers: SubscriberIndex::new(),
            checker: checker.clone(),
            recheck_on_foreground: config.monitor.recheck_on_foreground,
            failed_operations: 0,
        };
        debug!(actor = %id, checker = %checker.id(), "Spawning permission monitor");

        (actor, MonitorHandle { id, tx, checker }, rx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<MonitorMessage>) {
        info!(actor = %self.id, "Permission monitor started");
        self.request_check();

        while let Some(msg) = rx.recv().await {
            match msg {
                MonitorMessage::Subscribe {
                    permissions,
                    subscriber,
                } => self.subscribe(&permissions, &subscriber),
                MonitorMessage::Unsubscribe(actor) => {
                    let removed = self.subscribers.remove(actor);
                    debug!(actor = %self.id, subscriber = %actor, removed, "Unsubscribed");
                }
                MonitorMessage::TriggerPermissionCheck => self.request_check(),
                MonitorMessage::TriggerPermissionRequest(permission) => {
                    if let Err(e) = self.checker.trigger_permission_request(permission) {
                        warn!(actor = %self.id, %permission, error = %e, "Checker unreachable");
                    }
                }
                MonitorMessage::PermissionsChecked(statuses) => {
                    for (permission, status) in self.permissions.changes_from(&statuses) {
                        self.update(permission, status);
                    }
                }
                MonitorMessage::PermissionRequestCompleted { permission, status } => {
                    self.update(permission, status);
                }
                MonitorMessage::ProviderFailed { permission, reason } => {
                    self.failed_operations += 1;
                    warn!(
                        actor = %self.id,
                        permission = ?permission,
                        %reason,
                        failed_operations = self.failed_operations,
                        "Provider operation failed, statuses unchanged"
                    );
                }
                MonitorMessage::Lifecycle(event) => self.lifecycle(event),
                MonitorMessage::Snapshot(reply) => {
                    // The caller may have given up waiting.
                    let _ = reply.send(self.snapshot());
                }
                MonitorMessage::Stop => break,
            }
        }

        self.checker.stop();
        info!(actor = %self.id, "Permission monitor stopped");
    }

    fn request_check(&self) {
        if let Err(e) = self.checker.trigger_permission_check() {
            warn!(actor = %self.id, error = %e, "Checker unreachable");
        }
    }

    fn subscribe(&mut self, permissions: &[Permission], subscriber: &Subscriber) {
        for &permission in permissions {
            if self.subscribers.insert(permission, subscriber.clone()) {
                debug!(
                    actor = %self.id,
                    subscriber = %subscriber.id(),
                    %permission,
                    count = self.subscribers.subscribers(permission).len(),
                    "Subscriber added"
                );
            } else {
                debug!(
                    actor = %self.id,
                    subscriber = %subscriber.id(),
                    %permission,
                    "Already subscribed"
                );
            }
        }
    }

    /// Store a status and notify that permission's subscribers if it changed.
    fn update(&mut self, permission: Permission, status: PermissionStatus) {
        if !self.permissions.set(permission, status) {
            return;
        }
        info!(actor = %self.id, %permission, %status, "Permission status changed");

        let change = StatusChanged { permission, status };
        let closed: Vec<ActorId> = self
            .subscribers
            .subscribers(permission)
            .iter()
            .filter(|subscriber| subscriber.send(change).is_err())
            .map(Subscriber::id)
            .collect();

        for subscriber in closed {
            warn!(actor = %self.id, %subscriber, "Subscriber gone, removing");
            self.subscribers.remove(subscriber);
        }
    }

    fn lifecycle(&mut self, event: LifecycleEvent) {
        let previous = self.regions.lifecycle;
        let next = previous.transition(event);
        self.regions.lifecycle = next;
        debug!(actor = %self.id, ?previous, ?next, "Lifecycle transition");

        if self.recheck_on_foreground
            && previous == LifecycleState::Background
            && next == LifecycleState::Foreground
        {
            debug!(actor = %self.id, "Foregrounded, re-checking permissions");
            self.request_check();
        }
    }

    fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            lifecycle: self.regions.lifecycle,
            permissions: self.permissions.clone(),
            subscribers: self.subscribers.ids(),
            failed_operations: self.failed_operations,
        }
    }
}

/// Handle to a running [`PermissionMonitor`].
///
/// The monitor stops when [`stop`](Self::stop) is called or every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    id: ActorId,
    tx: mpsc::UnboundedSender<MonitorMessage>,
    checker: CheckerHandle,
}

impl MonitorHandle {
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// The checker embedded in this monitor.
    pub const fn checker(&self) -> &CheckerHandle {
        &self.checker
    }

    /// Add `subscriber` to the set of every listed permission. Subscribing
    /// twice is a no-op.
    pub fn subscribe_to_permission_statuses(
        &self,
        permissions: &[Permission],
        subscriber: Subscriber,
    ) -> Result<(), ActorError> {
        self.send(MonitorMessage::Subscribe {
            permissions: permissions.to_vec(),
            subscriber,
        })
    }

    /// Remove an actor from every subscription set.
    pub fn unsubscribe(&self, actor: ActorId) -> Result<(), ActorError> {
        self.send(MonitorMessage::Unsubscribe(actor))
    }

    pub fn trigger_permission_check(&self) -> Result<(), ActorError> {
        self.send(MonitorMessage::TriggerPermissionCheck)
    }

    pub fn trigger_permission_request(&self, permission: Permission) -> Result<(), ActorError> {
        self.send(MonitorMessage::TriggerPermissionRequest(permission))
    }

    pub fn application_foregrounded(&self) -> Result<(), ActorError> {
        self.send(MonitorMessage::Lifecycle(LifecycleEvent::Foregrounded))
    }

    pub fn application_backgrounded(&self) -> Result<(), ActorError> {
        self.send(MonitorMessage::Lifecycle(LifecycleEvent::Backgrounded))
    }

    /// Current state, as seen after every previously sent message.
    pub async fn snapshot(&self) -> Result<MonitorSnapshot, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.send(MonitorMessage::Snapshot(reply))?;
        rx.await.map_err(|_| ActorError::NoReply { actor: self.id })
    }

    /// Ask the monitor, and its checker, to stop.
    pub fn stop(&self) {
        if self.send(MonitorMessage::Stop).is_err() {
            debug!(actor = %self.id, "Monitor already stopped");
        }
    }

    fn send(&self, msg: MonitorMessage) -> Result<(), ActorError> {
        self.tx
            .send(msg)
            .map_err(|_| ActorError::MailboxClosed { actor: self.id })
    }
}
