//! Checker/Requester actor loop and handle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use permwatch_core::config::CheckerConfig;
use permwatch_core::{Permission, PermissionProvider, PermissionStatusMap, ProviderError};

use super::types::{CheckerEvent, CheckerMessage, CheckerSnapshot, CheckerState, Outcome};
use crate::actor::{ActorId, Recipient, send_to_parent};
use crate::error::ActorError;

/// The provider call currently awaited.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    operation: u64,
    state: CheckerState,
}

/// Actor performing one provider check or request at a time.
pub struct PermissionChecker {
    id: ActorId,
    provider: Arc<dyn PermissionProvider>,
    parent: Option<Recipient<CheckerEvent>>,
    timeout: Duration,
    /// Weak so that the actor stops once every handle is dropped.
    mailbox: mpsc::WeakUnboundedSender<CheckerMessage>,
    statuses: PermissionStatusMap,
    in_flight: Option<InFlight>,
    next_operation: u64,
    completed_operations: u64,
    snapshot_tx: watch::Sender<CheckerSnapshot>,
}

impl PermissionChecker {
    /// Spawn a checker reporting to `parent`.
    ///
    /// `parent` may be `None`; results are then only visible through
    /// [`CheckerHandle::snapshot`].
    pub fn spawn(
        provider: Arc<dyn PermissionProvider>,
        parent: Option<Recipient<CheckerEvent>>,
        config: &CheckerConfig,
    ) -> CheckerHandle {
        let id = ActorId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(CheckerSnapshot::default());

        let actor = Self {
            id,
            provider,
            parent,
            timeout: config.provider_timeout(),
            mailbox: tx.downgrade(),
            statuses: PermissionStatusMap::new(),
            in_flight: None,
            next_operation: 0,
            completed_operations: 0,
            snapshot_tx,
        };
        debug!(actor = %id, has_parent = actor.parent.is_some(), "Spawning permission checker");
        tokio::spawn(actor.run(rx));

        CheckerHandle {
            id,
            tx,
            snapshot: snapshot_rx,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<CheckerMessage>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                CheckerMessage::TriggerPermissionCheck => self.trigger_check(),
                CheckerMessage::TriggerPermissionRequest(permission) => {
                    self.trigger_request(permission);
                }
                CheckerMessage::Completed { operation, outcome } => {
                    self.complete(operation, outcome);
                }
                CheckerMessage::Stop => break,
            }
        }
        debug!(actor = %self.id, "Permission checker stopped");
    }

    fn state(&self) -> CheckerState {
        self.in_flight.map_or(CheckerState::Idle, |f| f.state)
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(CheckerSnapshot {
            state: self.state(),
            statuses: self.statuses.clone(),
            completed_operations: self.completed_operations,
        });
    }

    /// Enter a transient state. Returns `None` when busy, in which case the
    /// trigger is dropped rather than queued.
    fn begin(
        &mut self,
        state: CheckerState,
    ) -> Option<(u64, mpsc::UnboundedSender<CheckerMessage>)> {
        if let Some(current) = self.in_flight {
            debug!(
                actor = %self.id,
                busy = ?current.state,
                ignored = ?state,
                "Checker busy, trigger ignored"
            );
            return None;
        }
        let mailbox = self.mailbox.upgrade()?;

        self.next_operation += 1;
        let operation = self.next_operation;
        self.in_flight = Some(InFlight { operation, state });
        self.publish();
        Some((operation, mailbox))
    }

    fn trigger_check(&mut self) {
        let Some((operation, mailbox)) = self.begin(CheckerState::CheckingPermission) else {
            return;
        };
        debug!(actor = %self.id, operation, "Checking all permissions");

        let provider = Arc::clone(&self.provider);
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = bounded(timeout, provider.check_all()).await;
            deliver(&mailbox, operation, Outcome::Checked(result));
        });
    }

    fn trigger_request(&mut self, permission: Permission) {
        let Some((operation, mailbox)) =
            self.begin(CheckerState::RequestingPermission(permission))
        else {
            return;
        };
        debug!(actor = %self.id, operation, %permission, "Requesting permission");

        let provider = Arc::clone(&self.provider);
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = bounded(timeout, provider.request(permission)).await;
            deliver(&mailbox, operation, Outcome::Requested(permission, result));
        });
    }

    fn complete(&mut self, operation: u64, outcome: Outcome) {
        match self.in_flight {
            Some(current) if current.operation == operation => {
                self.in_flight = None;
                self.completed_operations += 1;
            }
            _ => {
                warn!(actor = %self.id, operation, "Completion for unknown operation ignored");
                return;
            }
        }

        let event = match outcome {
            Outcome::Checked(Ok(statuses)) => {
                info!(actor = %self.id, ?statuses, "Permissions checked");
                self.statuses = statuses.clone();
                CheckerEvent::AllPermissionsChecked { statuses }
            }
            Outcome::Checked(Err(reason)) => {
                warn!(actor = %self.id, %reason, "Permission check failed");
                CheckerEvent::CheckFailed { reason }
            }
            Outcome::Requested(permission, Ok(status)) => {
                info!(actor = %self.id, %permission, %status, "Permission request completed");
                self.statuses.set(permission, status);
                CheckerEvent::PermissionRequestCompleted { permission, status }
            }
            Outcome::Requested(permission, Err(reason)) => {
                warn!(actor = %self.id, %permission, %reason, "Permission request failed");
                CheckerEvent::RequestFailed { permission, reason }
            }
        };

        self.publish();
        send_to_parent(self.parent.as_ref(), event, self.id);
    }
}

/// Run a provider call under the configured timeout.
async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, String> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(format!(
            "provider call timed out after {}ms",
            timeout.as_millis()
        )),
    }
}

fn deliver(mailbox: &mpsc::UnboundedSender<CheckerMessage>, operation: u64, outcome: Outcome) {
    if mailbox
        .send(CheckerMessage::Completed { operation, outcome })
        .is_err()
    {
        debug!(operation, "Checker stopped before provider call completed");
    }
}

/// Handle to a running [`PermissionChecker`].
#[derive(Debug, Clone)]
pub struct CheckerHandle {
    id: ActorId,
    tx: mpsc::UnboundedSender<CheckerMessage>,
    snapshot: watch::Receiver<CheckerSnapshot>,
}

impl CheckerHandle {
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Start a check of every permission. Ignored while busy.
    pub fn trigger_permission_check(&self) -> Result<(), ActorError> {
        self.send(CheckerMessage::TriggerPermissionCheck)
    }

    /// Start a request for one permission. Ignored while busy.
    pub fn trigger_permission_request(&self, permission: Permission) -> Result<(), ActorError> {
        self.send(CheckerMessage::TriggerPermissionRequest(permission))
    }

    /// Ask the actor to stop after the current message.
    pub fn stop(&self) {
        if self.send(CheckerMessage::Stop).is_err() {
            debug!(actor = %self.id, "Checker already stopped");
        }
    }

    pub fn state(&self) -> CheckerState {
        self.snapshot.borrow().state
    }

    pub fn snapshot(&self) -> CheckerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until the published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&CheckerSnapshot) -> bool,
    ) -> Result<CheckerSnapshot, ActorError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ActorError::MailboxClosed { actor: self.id })?;
        Ok(snapshot.clone())
    }

    fn send(&self, msg: CheckerMessage) -> Result<(), ActorError> {
        self.tx
            .send(msg)
            .map_err(|_| ActorError::MailboxClosed { actor: self.id })
    }
}
