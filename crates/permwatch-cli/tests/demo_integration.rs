#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests for the CLI flows against live actors.

use std::sync::Arc;

use permwatch_cli::demo_cmd::{DemoArgs, demo};
use permwatch_cli::feature::{Counting, CountingFeature, PermissionHandling};
use permwatch_core::config::{ProviderConfig, load_config_file};
use permwatch_core::{Config, Permission, PermissionStatus, StaticProvider};

fn demo_args(increments: u32) -> DemoArgs {
    DemoArgs {
        increments,
        settle_ms: 100,
    }
}

#[tokio::test]
async fn demo_requests_bluetooth_after_limit() {
    let feature = demo(
        Arc::new(StaticProvider::default()),
        &Config::default(),
        &demo_args(CountingFeature::LIMIT + 1),
    )
    .await
    .unwrap();

    assert_eq!(feature.count(), 3);
    assert_eq!(feature.counting(), Counting::Disabled);
    assert_eq!(feature.handling(), PermissionHandling::Active);
    let types: Vec<String> = feature.events().iter().map(|e| e.event_type()).collect();
    assert_eq!(types, ["permissions.bluetooth.granted"]);
    assert_eq!(feature.permission_status(), PermissionStatus::Granted);
}

#[tokio::test]
async fn demo_below_limit_never_asks() {
    let feature = demo(
        Arc::new(StaticProvider::default()),
        &Config::default(),
        &demo_args(2),
    )
    .await
    .unwrap();

    assert_eq!(feature.count(), 2);
    assert_eq!(feature.handling(), PermissionHandling::Idle);
    assert!(feature.events().is_empty());
}

#[tokio::test]
async fn demo_follows_scripted_provider_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{ "provider": { "request": { "bluetooth": "blocked" }, "latency_ms": 5 } }"#,
    )
    .unwrap();
    let config = load_config_file(&path).unwrap();
    assert_eq!(
        config.provider.request.get(&Permission::Bluetooth),
        Some(&PermissionStatus::Blocked)
    );

    let feature = demo(
        permwatch_cli::static_provider(&config),
        &config,
        &demo_args(CountingFeature::LIMIT + 1),
    )
    .await
    .unwrap();
    assert_eq!(feature.permission_status(), PermissionStatus::Blocked);
}

#[tokio::test]
async fn default_config_checks_everything_denied() {
    let config = Config::default();
    assert_eq!(config.provider.check, ProviderConfig::default().check);
    let statuses = permwatch_cli::check_cmd::check_all(permwatch_cli::static_provider(&config), &config.checker)
        .await
        .unwrap();
    assert_eq!(statuses.get(Permission::Microphone), PermissionStatus::Denied);
}
