//! Sample feature component that needs a permission part way through.
//!
//! The feature counts up to [`CountingFeature::LIMIT`]. The next increment
//! disables counting and asks for bluetooth through its reporting actor.
//! Every relayed [`PermissionEvent`] is recorded.

use tracing::{debug, info};

use permwatch_core::{Permission, PermissionStatus};
use permwatch_runtime::{ActorError, PermissionEvent, ReportingHandle};

/// Counting region of the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Counting {
    #[default]
    Enabled,
    Disabled,
}

/// Permission-handling region of the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionHandling {
    #[default]
    Idle,
    Active,
}

#[derive(Debug)]
pub struct CountingFeature {
    count: u32,
    counting: Counting,
    handling: PermissionHandling,
    reporter: ReportingHandle,
    events: Vec<PermissionEvent>,
}

impl CountingFeature {
    pub const LIMIT: u32 = 3;
    pub const PERMISSION: Permission = Permission::Bluetooth;

    pub const fn new(reporter: ReportingHandle) -> Self {
        Self {
            count: 0,
            counting: Counting::Enabled,
            handling: PermissionHandling::Idle,
            reporter,
            events: Vec::new(),
        }
    }

    /// Count one step. At the limit this disables counting and requests the
    /// permission instead; once disabled it does nothing.
    pub fn increment(&mut self) -> Result<u32, ActorError> {
        if self.counting == Counting::Disabled {
            debug!(count = self.count, "Counting disabled, increment ignored");
            return Ok(self.count);
        }
        if self.count < Self::LIMIT {
            self.count += 1;
            return Ok(self.count);
        }

        info!(
            count = self.count,
            permission = %Self::PERMISSION,
            "Count limit reached, requesting permission"
        );
        self.counting = Counting::Disabled;
        self.handling = PermissionHandling::Active;
        self.reporter.request_permission(Self::PERMISSION)?;
        Ok(self.count)
    }

    pub fn record(&mut self, event: PermissionEvent) {
        debug!(event = %event, "Feature received permission event");
        self.events.push(event);
    }

    /// Latest recorded status of the feature's permission.
    pub fn permission_status(&self) -> PermissionStatus {
        self.events
            .iter()
            .rev()
            .find(|e| e.permission == Self::PERMISSION)
            .map_or(PermissionStatus::Unasked, |e| e.status)
    }

    pub const fn count(&self) -> u32 {
        self.count
    }

    pub const fn counting(&self) -> Counting {
        self.counting
    }

    pub const fn handling(&self) -> PermissionHandling {
        self.handling
    }

    pub fn events(&self) -> &[PermissionEvent] {
        &self.events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use permwatch_core::{Config, StaticProvider};
    use permwatch_runtime::testing::GatedProvider;
    use permwatch_runtime::{CheckerState, PermissionMonitor, ReportingActor, ReportingInput};

    use super::*;

    /// A feature whose checker never answers, so requests stay observable.
    fn feature() -> (CountingFeature, permwatch_runtime::MonitorHandle) {
        let provider = Arc::new(GatedProvider::new(StaticProvider::default()));
        let monitor = PermissionMonitor::spawn(provider, &Config::default());
        let reporter = ReportingActor::spawn(
            ReportingInput {
                permissions: vec![CountingFeature::PERMISSION],
                parent: None,
            },
            monitor.clone(),
            monitor.checker().clone(),
        )
        .unwrap();
        (CountingFeature::new(reporter), monitor)
    }

    #[tokio::test]
    async fn starts_enabled_and_idle() {
        let (feature, _monitor) = feature();
        assert_eq!(feature.count(), 0);
        assert_eq!(feature.counting(), Counting::Enabled);
        assert_eq!(feature.handling(), PermissionHandling::Idle);
        assert_eq!(feature.permission_status(), PermissionStatus::Unasked);
    }

    #[tokio::test]
    async fn increments_below_limit() {
        let (mut feature, _monitor) = feature();
        assert_eq!(feature.increment().unwrap(), 1);
        assert_eq!(feature.counting(), Counting::Enabled);
    }

    #[tokio::test]
    async fn stops_at_limit_and_asks_for_permission() {
        let (mut feature, _monitor) = feature();
        for _ in 0..4 {
            feature.increment().unwrap();
        }
        assert_eq!(feature.count(), 3);
        assert_eq!(feature.counting(), Counting::Disabled);
        assert_eq!(feature.handling(), PermissionHandling::Active);

        // Further increments are ignored.
        assert_eq!(feature.increment().unwrap(), 3);
    }

    #[tokio::test]
    async fn request_reaches_the_checker() {
        let provider = Arc::new(GatedProvider::new(StaticProvider::default()));
        let monitor = PermissionMonitor::spawn(provider.clone(), &Config::default());
        // Let the initial check through so the checker is free.
        provider.release(1);
        monitor
            .checker()
            .wait_for(|s| s.state.is_idle() && s.completed_operations == 1)
            .await
            .unwrap();

        let reporter = ReportingActor::spawn(
            ReportingInput {
                permissions: vec![CountingFeature::PERMISSION],
                parent: None,
            },
            monitor.clone(),
            monitor.checker().clone(),
        )
        .unwrap();
        let mut feature = CountingFeature::new(reporter);
        for _ in 0..4 {
            feature.increment().unwrap();
        }

        monitor
            .checker()
            .wait_for(|s| s.state == CheckerState::RequestingPermission(Permission::Bluetooth))
            .await
            .unwrap();
        provider.release(1);
    }

    #[tokio::test]
    async fn permission_status_tracks_latest_event() {
        let (mut feature, _monitor) = feature();

        feature.record(PermissionEvent {
            permission: Permission::Bluetooth,
            status: PermissionStatus::Denied,
        });
        feature.record(PermissionEvent {
            permission: Permission::Microphone,
            status: PermissionStatus::Granted,
        });
        assert_eq!(feature.permission_status(), PermissionStatus::Denied);

        feature.record(PermissionEvent {
            permission: Permission::Bluetooth,
            status: PermissionStatus::Granted,
        });
        assert_eq!(feature.permission_status(), PermissionStatus::Granted);
        assert_eq!(feature.events().len(), 3);
    }
}
