//! Provider contract for the platform permission primitives.
//!
//! The runtime never checks or requests permissions itself; it calls a
//! [`PermissionProvider`]. Native integrations implement the trait outside
//! this workspace. [`StaticProvider`] answers from configuration and is what
//! the CLI and the tests run against.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::permissions::{Permission, PermissionStatus, PermissionStatusMap};

/// Errors a provider may report instead of a status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The platform refused or failed the operation.
    #[error("Provider failed: {0}")]
    Failed(String),

    /// The platform does not know about this permission.
    #[error("Permission not supported by provider: {0}")]
    Unsupported(Permission),
}

/// Platform capability that actually checks or requests permissions.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Check the current status of every known permission.
    async fn check_all(&self) -> Result<PermissionStatusMap, ProviderError>;

    /// Prompt for a single permission and return the resulting status.
    async fn request(&self, permission: Permission) -> Result<PermissionStatus, ProviderError>;
}

/// Provider answering from a fixed script.
///
/// The default script reports every permission as denied on check and
/// grants any request.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    check: PermissionStatusMap,
    request: BTreeMap<Permission, PermissionStatus>,
    latency: Duration,
}

impl StaticProvider {
    pub fn new(check: PermissionStatusMap) -> Self {
        Self {
            check,
            request: BTreeMap::new(),
            latency: Duration::ZERO,
        }
    }

    /// Build from the `provider` section of the configuration.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            check: config.check.clone(),
            request: config.request.clone(),
            latency: Duration::from_millis(config.latency_ms),
        }
    }

    /// Status returned when `permission` is requested.
    #[must_use]
    pub fn with_request_result(mut self, permission: Permission, status: PermissionStatus) -> Self {
        self.request.insert(permission, status);
        self
    }

    /// Delay applied to every call.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new(PermissionStatusMap::uniform(PermissionStatus::Denied))
    }
}

#[async_trait]
impl PermissionProvider for StaticProvider {
    async fn check_all(&self) -> Result<PermissionStatusMap, ProviderError> {
        self.simulate_latency().await;
        debug!(statuses = ?self.check, "Static provider check");
        Ok(self.check.clone())
    }

    async fn request(&self, permission: Permission) -> Result<PermissionStatus, ProviderError> {
        self.simulate_latency().await;
        let status = self
            .request
            .get(&permission)
            .copied()
            .unwrap_or(PermissionStatus::Granted);
        debug!(%permission, %status, "Static provider request");
        Ok(status)
    }
}
