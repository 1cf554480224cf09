//! Waiting on actors from outside the actor system.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::debug;

use permwatch_core::Config;
use permwatch_runtime::{CheckerHandle, PermissionEvent};

/// How long a caller waits for one provider call, slightly above the
/// checker's own timeout so the checker always reports first.
pub fn completion_bound(config: &Config) -> Duration {
    config.checker.provider_timeout() + Duration::from_secs(1)
}

/// Wait until `checker` is idle with more than `after` finished provider
/// calls. Returns the new count.
pub async fn wait_for_completion(
    checker: &CheckerHandle,
    after: u64,
    bound: Duration,
) -> anyhow::Result<u64> {
    let snapshot = tokio::time::timeout(
        bound,
        checker.wait_for(|s| s.state.is_idle() && s.completed_operations > after),
    )
    .await
    .with_context(|| {
        format!(
            "checker {} did not finish within {}ms",
            checker.id(),
            bound.as_millis()
        )
    })??;
    Ok(snapshot.completed_operations)
}

/// Pass events to `on_event` until the stream has been quiet for `settle`
/// (when given), `shutdown` resolves or every sender is gone.
///
/// Returns how many events were handled.
pub async fn drain_events(
    events: &mut mpsc::UnboundedReceiver<PermissionEvent>,
    settle: Option<Duration>,
    shutdown: impl Future<Output = ()>,
    mut on_event: impl FnMut(&PermissionEvent) -> anyhow::Result<()>,
) -> anyhow::Result<usize> {
    tokio::pin!(shutdown);
    let mut seen = 0;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!(seen, "Event stream closed");
                    break;
                };
                seen += 1;
                on_event(&event)?;
            }
            () = tokio::time::sleep(settle.unwrap_or_default()), if settle.is_some() => {
                debug!(seen, "Event stream settled");
                break;
            }
            () = &mut shutdown => {
                debug!(seen, "Shutdown requested");
                break;
            }
        }
    }
    Ok(seen)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use permwatch_core::{Permission, PermissionStatus};

    use super::*;

    fn event(status: PermissionStatus) -> PermissionEvent {
        PermissionEvent {
            permission: Permission::Bluetooth,
            status,
        }
    }

    #[tokio::test]
    async fn drain_stops_after_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(event(PermissionStatus::Denied)).unwrap();
        tx.send(event(PermissionStatus::Granted)).unwrap();

        let mut types = Vec::new();
        let seen = drain_events(
            &mut rx,
            Some(Duration::from_millis(20)),
            std::future::pending(),
            |e| {
                types.push(e.event_type());
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(seen, 2);
        assert_eq!(
            types,
            ["permissions.bluetooth.denied", "permissions.bluetooth.granted"]
        );
        drop(tx);
    }

    #[tokio::test]
    async fn drain_stops_on_shutdown_without_settle() {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let seen = drain_events(&mut rx, None, async {}, |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn drain_propagates_handler_errors() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(event(PermissionStatus::Blocked)).unwrap();
        let result = drain_events(&mut rx, None, std::future::pending(), |_| {
            anyhow::bail!("stdout closed")
        })
        .await;
        assert!(result.is_err());
    }
}
