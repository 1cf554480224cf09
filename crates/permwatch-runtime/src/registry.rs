//! Service registry for the long-lived permission actors.
//!
//! Holds the monitor and its checker under well-known identities so that
//! feature components can find them without being wired up by hand. Lookups
//! can wait for registration, which replaces start-up ordering tricks with
//! an explicit readiness handshake.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use crate::checker::CheckerHandle;
use crate::error::ActorError;
use crate::monitor::MonitorHandle;

/// Well-known identities a service can register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownId {
    PermissionMonitoring,
    PermissionCheckerAndRequester,
}

impl fmt::Display for WellKnownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PermissionMonitoring => "permissionMonitoring",
            Self::PermissionCheckerAndRequester => "permissionCheckerAndRequester",
        })
    }
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("An actor is already registered as {0}")]
    AlreadyRegistered(WellKnownId),
}

struct Slot<T> {
    id: WellKnownId,
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Slot<T> {
    fn new(id: WellKnownId) -> Self {
        Self {
            id,
            tx: watch::Sender::new(None),
        }
    }

    fn is_vacant(&self) -> bool {
        self.tx.borrow().is_none()
    }

    fn register(&self, value: T) -> Result<(), RegistryError> {
        let mut value = Some(value);
        let inserted = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        });
        if inserted {
            info!(service = %self.id, "Service registered");
            Ok(())
        } else {
            Err(RegistryError::AlreadyRegistered(self.id))
        }
    }

    fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    async fn wait(&self, timeout: Duration) -> Result<T, ActorError> {
        let unavailable = || ActorError::ServiceUnavailable {
            service: self.id,
            waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(slot)) => (*slot).clone().ok_or_else(unavailable),
            _ => Err(unavailable()),
        }
    }
}

struct Inner {
    /// Held for every registration so that paired registrations are atomic.
    registration: Mutex<()>,
    monitor: Slot<MonitorHandle>,
    checker: Slot<CheckerHandle>,
}

/// Shared lookup table from [`WellKnownId`] to live actor handles.
///
/// Cloning shares the same table. At most one actor may register under each
/// identity.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<Inner>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                registration: Mutex::new(()),
                monitor: Slot::new(WellKnownId::PermissionMonitoring),
                checker: Slot::new(WellKnownId::PermissionCheckerAndRequester),
            }),
        }
    }

    /// Register a monitor and its embedded checker together.
    ///
    /// Nothing is registered unless both identities are free.
    pub fn register_monitoring(&self, monitor: &MonitorHandle) -> Result<(), RegistryError> {
        let _registration = self.lock();
        if !self.inner.monitor.is_vacant() {
            return Err(RegistryError::AlreadyRegistered(
                WellKnownId::PermissionMonitoring,
            ));
        }
        if !self.inner.checker.is_vacant() {
            return Err(RegistryError::AlreadyRegistered(
                WellKnownId::PermissionCheckerAndRequester,
            ));
        }
        self.inner.monitor.register(monitor.clone())?;
        self.inner.checker.register(monitor.checker().clone())
    }

    pub fn register_monitor(&self, monitor: MonitorHandle) -> Result<(), RegistryError> {
        let _registration = self.lock();
        self.inner.monitor.register(monitor)
    }

    pub fn register_checker(&self, checker: CheckerHandle) -> Result<(), RegistryError> {
        let _registration = self.lock();
        self.inner.checker.register(checker)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.inner
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn monitor(&self) -> Option<MonitorHandle> {
        self.inner.monitor.get()
    }

    pub fn checker(&self) -> Option<CheckerHandle> {
        self.inner.checker.get()
    }

    /// Wait until a monitor is registered, for at most `timeout`.
    pub async fn wait_for_monitor(&self, timeout: Duration) -> Result<MonitorHandle, ActorError> {
        self.inner.monitor.wait(timeout).await
    }

    /// Wait until a checker is registered, for at most `timeout`.
    pub async fn wait_for_checker(&self, timeout: Duration) -> Result<CheckerHandle, ActorError> {
        self.inner.checker.wait(timeout).await
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("monitor", &self.monitor().map(|m| m.id()))
            .field("checker", &self.checker().map(|c| c.id()))
            .finish()
    }
}
