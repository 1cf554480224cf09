//! Configuration resolution for permwatch.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/permwatch/settings.json)
//! 3. Project config (.permwatch/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::permissions::{Permission, PermissionStatus, PermissionStatusMap};

/// Complete permwatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            checker: CheckerConfig::default(),
            monitor: MonitorConfig::default(),
            reporting: ReportingConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Checker/Requester actor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Upper bound for a single provider call (milliseconds).
    pub provider_timeout_ms: u64,
}

impl CheckerConfig {
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 30_000,
        }
    }
}

/// Monitoring actor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Re-check every permission when the application returns to the
    /// foreground.
    pub recheck_on_foreground: bool,
}

/// Reporting actor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// How long to wait for the monitor and checker to register (milliseconds).
    pub lookup_timeout_ms: u64,
}

impl ReportingConfig {
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 5_000,
        }
    }
}

/// Script for the built-in static provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Statuses returned by a check.
    #[serde(default = "denied_everywhere")]
    pub check: PermissionStatusMap,
    /// Status returned per requested permission; unlisted ones are granted.
    #[serde(default)]
    pub request: BTreeMap<Permission, PermissionStatus>,
    /// Artificial delay applied to every provider call (milliseconds).
    #[serde(default)]
    pub latency_ms: u64,
}

fn denied_everywhere() -> PermissionStatusMap {
    PermissionStatusMap::uniform(PermissionStatus::Denied)
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            check: denied_everywhere(),
            request: BTreeMap::new(),
            latency_ms: 0,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    resolve_config(
        global_config_path().as_deref(),
        project_dir,
        |key| std::env::var(key).ok(),
    )
}

/// Resolve configuration from explicit layers.
///
/// Each settings file only overrides the keys it contains; everything else
/// keeps the value from the layer below.
pub fn resolve_config(
    global_path: Option<&Path>,
    project_dir: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    // Load global config
    if let Some(global_path) = global_path
        && global_path.exists()
    {
        merge_config(&mut merged, read_config_value(global_path)?);
    }

    // Load project config
    if let Some(dir) = project_dir {
        let project_path = dir.join(".permwatch").join("settings.json");
        if project_path.exists() {
            merge_config(&mut merged, read_config_value(&project_path)?);
        }
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid merged configuration: {e}")))?;
    apply_env_overrides(&mut config, lookup);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("permwatch").join("settings.json"))
}

fn read_config_value(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Read a single settings file on top of the built-in defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    serde_json::from_value(read_config_value(path)?).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Overlay `overlay` onto `base` key by key. Objects merge recursively; any
/// other value replaces what was there.
pub fn merge_config(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_config(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `PERMWATCH_*` overrides read through `lookup`.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("PERMWATCH_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Some(n) = lookup("PERMWATCH_PROVIDER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.checker.provider_timeout_ms = n;
    }
    if let Some(n) = lookup("PERMWATCH_LOOKUP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.reporting.lookup_timeout_ms = n;
    }
    if let Some(b) = lookup("PERMWATCH_RECHECK_ON_FOREGROUND").and_then(|v| v.parse().ok()) {
        config.monitor.recheck_on_foreground = b;
    }
}
