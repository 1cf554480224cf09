//! permwatch CLI library
//!
//! Subcommands of the `permwatch` binary:
//! - `check` / `request`: one-shot provider calls through a standalone checker
//! - `watch`: monitor plus reporting actor, streaming permission events
//! - `demo`: the counting feature component end to end

use std::sync::Arc;

use permwatch_core::{Config, PermissionProvider, StaticProvider};

pub mod check_cmd;
pub mod demo_cmd;
pub mod feature;
pub mod wait;
pub mod watch_cmd;

/// Provider described by the `provider` section of `config`.
pub fn static_provider(config: &Config) -> Arc<dyn PermissionProvider> {
    Arc::new(StaticProvider::from_config(&config.provider))
}
