//! `demo` subcommand: drive the counting feature against live actors.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::info;

use permwatch_core::{Config, PermissionProvider};
use permwatch_runtime::{
    PermissionMonitor, Recipient, ReportingActor, ReportingInput, ServiceRegistry,
};

use crate::feature::{CountingFeature, PermissionHandling};
use crate::wait::{completion_bound, drain_events, wait_for_completion};

/// Arguments for `permwatch demo`.
#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Number of increments to send to the feature
    #[arg(long, default_value_t = CountingFeature::LIMIT + 1)]
    pub increments: u32,

    /// Quiet period that ends event collection (milliseconds)
    #[arg(long, default_value_t = 200)]
    pub settle_ms: u64,
}

/// Run the feature: wait for the initial check, increment, let the
/// permission request finish and collect the relayed events.
pub async fn demo(
    provider: Arc<dyn PermissionProvider>,
    config: &Config,
    args: &DemoArgs,
) -> anyhow::Result<CountingFeature> {
    let registry = ServiceRegistry::new();
    let monitor = PermissionMonitor::spawn_registered(provider, config, &registry)?;
    let bound = completion_bound(config);
    let completed = wait_for_completion(monitor.checker(), 0, bound).await?;

    let (parent, mut events) = Recipient::channel();
    let reporter = ReportingActor::spawn_from_registry(
        ReportingInput {
            permissions: vec![CountingFeature::PERMISSION],
            parent: Some(parent),
        },
        &registry,
        &config.reporting,
    )
    .await?;

    let mut feature = CountingFeature::new(reporter.clone());
    for _ in 0..args.increments {
        feature.increment()?;
    }
    if feature.handling() == PermissionHandling::Active {
        wait_for_completion(monitor.checker(), completed, bound).await?;
    }

    drain_events(
        &mut events,
        Some(Duration::from_millis(args.settle_ms)),
        std::future::pending(),
        |event| {
            feature.record(*event);
            Ok(())
        },
    )
    .await?;

    reporter.stop();
    monitor.stop();
    Ok(feature)
}

/// `permwatch demo`.
pub async fn run(config: &Config, args: &DemoArgs) -> anyhow::Result<()> {
    let feature = demo(crate::static_provider(config), config, args).await?;
    info!(count = feature.count(), events = feature.events().len(), "Demo finished");

    let mut stdout = io::stdout();
    writeln!(stdout, "count: {}", feature.count())?;
    writeln!(stdout, "counting: {:?}", feature.counting())?;
    writeln!(stdout, "permission handling: {:?}", feature.handling())?;
    for event in feature.events() {
        writeln!(stdout, "event: {event}")?;
    }
    writeln!(
        stdout,
        "{}: {}",
        CountingFeature::PERMISSION,
        feature.permission_status()
    )?;
    Ok(())
}
