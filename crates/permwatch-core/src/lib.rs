//! permwatch core library
//!
//! Shared functionality for permwatch components:
//! - Permission identifiers, statuses and the total status map
//! - Provider contract and the built-in static provider
//! - Configuration resolution and hierarchy
//! - Common error types and tracing setup

pub mod config;
pub mod error;
pub mod permissions;
pub mod provider;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use permissions::{Permission, PermissionStatus, PermissionStatusMap};
pub use provider::{PermissionProvider, ProviderError, StaticProvider};
