//! Providers for exercising the actors without a platform.
//!
//! - [`GatedProvider`] holds every call until the test releases it, which
//!   makes the transient checker states observable.
//! - [`FailingProvider`] rejects every call.
//! - [`HangingProvider`] never resolves.
//!
//! [`snapshot_when`] polls a monitor until its state matches.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use permwatch_core::{
    Permission, PermissionProvider, PermissionStatus, PermissionStatusMap, ProviderError,
};

use crate::monitor::{MonitorHandle, MonitorSnapshot};

/// Wraps another provider and blocks each call until released.
pub struct GatedProvider<P> {
    inner: P,
    gate: Arc<Semaphore>,
    calls: AtomicUsize,
}

impl<P: PermissionProvider> GatedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Let `n` pending or future calls proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Number of calls that reached the provider.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pass(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ProviderError::Failed("gate closed".into()))?;
        permit.forget();
        Ok(())
    }
}

#[async_trait]
impl<P: PermissionProvider> PermissionProvider for GatedProvider<P> {
    async fn check_all(&self) -> Result<PermissionStatusMap, ProviderError> {
        self.pass().await?;
        self.inner.check_all().await
    }

    async fn request(&self, permission: Permission) -> Result<PermissionStatus, ProviderError> {
        self.pass().await?;
        self.inner.request(permission).await
    }
}

/// Provider whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingProvider;

#[async_trait]
impl PermissionProvider for FailingProvider {
    async fn check_all(&self) -> Result<PermissionStatusMap, ProviderError> {
        Err(ProviderError::Failed("check rejected".into()))
    }

    async fn request(&self, permission: Permission) -> Result<PermissionStatus, ProviderError> {
        Err(ProviderError::Unsupported(permission))
    }
}

/// Provider whose calls never complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct HangingProvider;

#[async_trait]
impl PermissionProvider for HangingProvider {
    async fn check_all(&self) -> Result<PermissionStatusMap, ProviderError> {
        std::future::pending().await
    }

    async fn request(&self, _permission: Permission) -> Result<PermissionStatus, ProviderError> {
        std::future::pending().await
    }
}

/// Poll `monitor` until `predicate` holds or `timeout` elapses.
///
/// Returns `None` on timeout or if the monitor stops.
pub async fn snapshot_when(
    monitor: &MonitorHandle,
    timeout: Duration,
    mut predicate: impl FnMut(&MonitorSnapshot) -> bool,
) -> Option<MonitorSnapshot> {
    tokio::time::timeout(timeout, async {
        loop {
            let snapshot = monitor.snapshot().await.ok()?;
            if predicate(&snapshot) {
                return Some(snapshot);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .ok()
    .flatten()
}
