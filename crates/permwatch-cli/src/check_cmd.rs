//! One-shot `check` and `request` subcommands.
//!
//! Both run a standalone checker with no monitor. User-facing output uses
//! writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::info;

use permwatch_core::config::CheckerConfig;
use permwatch_core::{Config, Permission, PermissionProvider, PermissionStatusMap};
use permwatch_runtime::{CheckerEvent, PermissionChecker, PermissionEvent, Recipient};

/// Check every permission once.
pub async fn check_all(
    provider: Arc<dyn PermissionProvider>,
    config: &CheckerConfig,
) -> anyhow::Result<PermissionStatusMap> {
    match run_once(provider, config, None).await? {
        CheckerEvent::AllPermissionsChecked { statuses } => Ok(statuses),
        CheckerEvent::CheckFailed { reason } => bail!("Permission check failed: {reason}"),
        other => bail!("Unexpected checker event: {other:?}"),
    }
}

/// Request a single permission once.
pub async fn request_one(
    provider: Arc<dyn PermissionProvider>,
    config: &CheckerConfig,
    permission: Permission,
) -> anyhow::Result<PermissionEvent> {
    match run_once(provider, config, Some(permission)).await? {
        CheckerEvent::PermissionRequestCompleted { permission, status } => {
            Ok(PermissionEvent { permission, status })
        }
        CheckerEvent::RequestFailed { permission, reason } => {
            bail!("Request for {permission} failed: {reason}")
        }
        other => bail!("Unexpected checker event: {other:?}"),
    }
}

async fn run_once(
    provider: Arc<dyn PermissionProvider>,
    config: &CheckerConfig,
    request: Option<Permission>,
) -> anyhow::Result<CheckerEvent> {
    let (parent, mut events) = Recipient::channel();
    let checker = PermissionChecker::spawn(provider, Some(parent), config);
    match request {
        Some(permission) => checker.trigger_permission_request(permission)?,
        None => checker.trigger_permission_check()?,
    }
    // The provider timeout guarantees a reply.
    let event = events
        .recv()
        .await
        .context("Checker stopped without reporting")?;
    checker.stop();
    Ok(event)
}

/// `permwatch check`: print the status map as JSON.
pub async fn run_check(config: &Config) -> anyhow::Result<()> {
    let statuses = check_all(crate::static_provider(config), &config.checker).await?;
    info!(?statuses, "Check complete");
    writeln!(io::stdout(), "{}", serde_json::to_string_pretty(&statuses)?)?;
    Ok(())
}

/// `permwatch request <permission>`: print the completed request as JSON.
pub async fn run_request(config: &Config, permission: Permission) -> anyhow::Result<()> {
    let event = request_one(crate::static_provider(config), &config.checker, permission).await?;
    info!(event = %event, "Request complete");
    writeln!(io::stdout(), "{}", event_json(&event))?;
    Ok(())
}

/// JSON line describing a permission event.
pub fn event_json(event: &PermissionEvent) -> serde_json::Value {
    serde_json::json!({
        "event": event.event_type(),
        "permission": event.permission,
        "status": event.status,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use permwatch_core::{PermissionStatus, StaticProvider};
    use permwatch_runtime::testing::FailingProvider;

    use super::*;

    #[tokio::test]
    async fn check_all_returns_provider_map() {
        let statuses = check_all(Arc::new(StaticProvider::default()), &CheckerConfig::default())
            .await
            .unwrap();
        assert_eq!(statuses, PermissionStatusMap::uniform(PermissionStatus::Denied));
    }

    #[tokio::test]
    async fn request_one_uses_scripted_result() {
        let provider = StaticProvider::default()
            .with_request_result(Permission::Microphone, PermissionStatus::Blocked);
        let event = request_one(Arc::new(provider), &CheckerConfig::default(), Permission::Microphone)
            .await
            .unwrap();
        assert_eq!(event.event_type(), "permissions.microphone.blocked");
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let err = request_one(Arc::new(FailingProvider), &CheckerConfig::default(), Permission::Bluetooth)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bluetooth"));
        assert!(check_all(Arc::new(FailingProvider), &CheckerConfig::default()).await.is_err());
    }

    #[test]
    fn event_json_shape() {
        let value = event_json(&PermissionEvent {
            permission: Permission::Bluetooth,
            status: PermissionStatus::Granted,
        });
        assert_eq!(
            value,
            serde_json::json!({
                "event": "permissions.bluetooth.granted",
                "permission": "bluetooth",
                "status": "granted",
            })
        );
    }
}
