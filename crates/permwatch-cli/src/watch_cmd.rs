//! `watch` subcommand: stream permission events for a set of permissions.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::{info, warn};

use permwatch_core::{Config, Permission, PermissionProvider};
use permwatch_runtime::{
    PermissionEvent, PermissionMonitor, Recipient, ReportingActor, ReportingInput, ServiceRegistry,
};

use crate::check_cmd::event_json;
use crate::wait::{completion_bound, drain_events, wait_for_completion};

/// Arguments for `permwatch watch`.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Permission to subscribe to (repeatable)
    #[arg(short, long = "permission", required = true)]
    pub permissions: Vec<Permission>,

    /// Permission to request once the initial check is done (repeatable)
    #[arg(short, long = "request")]
    pub requests: Vec<Permission>,

    /// Exit after this many milliseconds without events (default: run until Ctrl+C)
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Run a monitor and one reporting actor, issue the requested permission
/// requests in order and hand every relayed event to `on_event`.
///
/// Returns how many events were relayed.
pub async fn watch(
    provider: Arc<dyn PermissionProvider>,
    config: &Config,
    args: &WatchArgs,
    shutdown: impl Future<Output = ()>,
    on_event: impl FnMut(&PermissionEvent) -> anyhow::Result<()>,
) -> anyhow::Result<usize> {
    let registry = ServiceRegistry::new();
    let monitor = PermissionMonitor::spawn_registered(provider, config, &registry)?;

    let (parent, mut events) = Recipient::channel();
    let reporter = ReportingActor::spawn_from_registry(
        ReportingInput {
            permissions: args.permissions.clone(),
            parent: Some(parent),
        },
        &registry,
        &config.reporting,
    )
    .await?;
    info!(
        monitor = %monitor.id(),
        reporter = %reporter.id(),
        permissions = ?args.permissions,
        "Watching permissions"
    );

    // The checker drops triggers while busy, so each request waits for the
    // previous provider call to finish.
    let bound = completion_bound(config);
    let mut completed = wait_for_completion(monitor.checker(), 0, bound).await?;
    for &permission in &args.requests {
        reporter.request_permission(permission)?;
        completed = wait_for_completion(monitor.checker(), completed, bound).await?;
    }

    let seen = drain_events(
        &mut events,
        args.settle_ms.map(Duration::from_millis),
        shutdown,
        on_event,
    )
    .await;

    reporter.stop();
    monitor.stop();
    seen
}

/// `permwatch watch`.
pub async fn run(config: &Config, args: &WatchArgs) -> anyhow::Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    let mut stdout = io::stdout();
    let seen = watch(
        crate::static_provider(config),
        config,
        args,
        shutdown,
        |event| {
            if args.json {
                writeln!(stdout, "{}", event_json(event))?;
            } else {
                writeln!(stdout, "{event}")?;
            }
            Ok(())
        },
    )
    .await?;
    info!(events = seen, "Watch finished");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use permwatch_core::{PermissionStatus, StaticProvider};

    use super::*;

    fn args(permissions: Vec<Permission>, requests: Vec<Permission>) -> WatchArgs {
        WatchArgs {
            permissions,
            requests,
            settle_ms: Some(100),
            json: false,
        }
    }

    #[tokio::test]
    async fn request_is_relayed_as_event() {
        let mut received = Vec::new();
        let seen = watch(
            Arc::new(StaticProvider::default()),
            &Config::default(),
            &args(vec![Permission::Bluetooth], vec![Permission::Bluetooth]),
            std::future::pending(),
            |event| {
                received.push(*event);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(seen, received.len());
        assert!(received.iter().all(|e| e.permission == Permission::Bluetooth));
        assert_eq!(
            received.last().map(PermissionEvent::event_type).as_deref(),
            Some("permissions.bluetooth.granted")
        );
    }

    #[tokio::test]
    async fn unwatched_permission_produces_no_events() {
        let mut received = Vec::new();
        watch(
            Arc::new(StaticProvider::default()),
            &Config::default(),
            &args(vec![Permission::Microphone], vec![Permission::Bluetooth]),
            std::future::pending(),
            |event| {
                received.push(*event);
                Ok(())
            },
        )
        .await
        .unwrap();

        // At most the initial check's microphone status, never bluetooth.
        assert!(received.iter().all(|e| e.permission == Permission::Microphone));
        assert!(
            received
                .iter()
                .all(|e| e.status == PermissionStatus::Denied)
        );
    }
}
