//! Permission identifiers, statuses and the total status map.
//!
//! The set of permissions is closed and known at build time. Every
//! [`PermissionStatusMap`] holds exactly one status for each of them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A runtime permission the application can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Bluetooth,
    Microphone,
}

impl Permission {
    /// Every known permission, in map order.
    pub const ALL: [Self; 2] = [Self::Bluetooth, Self::Microphone];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Microphone => "microphone",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownPermission(s.to_string()))
    }
}

/// Status of a single permission as last reported by the provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Never checked or requested.
    #[default]
    Unasked,
    Granted,
    Denied,
    /// Previously granted, since withdrawn by the user.
    Revoked,
    /// Denied in a way the application cannot prompt for again.
    Blocked,
}

impl PermissionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unasked => "unasked",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Revoked => "revoked",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unasked" => Ok(Self::Unasked),
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "revoked" => Ok(Self::Revoked),
            "blocked" => Ok(Self::Blocked),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// Mapping from every known [`Permission`] to its [`PermissionStatus`].
///
/// The map is always total: there is no way to build one with a missing
/// entry, so [`get`](Self::get) never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionStatusMap(BTreeMap<Permission, PermissionStatus>);

impl PermissionStatusMap {
    /// Every permission mapped to [`PermissionStatus::Unasked`].
    pub fn new() -> Self {
        Self::uniform(PermissionStatus::Unasked)
    }

    /// Every permission mapped to the same status.
    pub fn uniform(status: PermissionStatus) -> Self {
        Self(Permission::ALL.into_iter().map(|p| (p, status)).collect())
    }

    /// Build from a possibly partial set of entries. Missing permissions
    /// default to [`PermissionStatus::Unasked`].
    pub fn from_partial(entries: impl IntoIterator<Item = (Permission, PermissionStatus)>) -> Self {
        let mut map = Self::new();
        for (permission, status) in entries {
            map.0.insert(permission, status);
        }
        map
    }

    pub fn get(&self, permission: Permission) -> PermissionStatus {
        self.0.get(&permission).copied().unwrap_or_default()
    }

    /// Set one entry. Returns `true` if the stored status changed.
    pub fn set(&mut self, permission: Permission, status: PermissionStatus) -> bool {
        self.0.insert(permission, status) != Some(status)
    }

    /// Entries of `other` that differ from `self`, in permission order.
    pub fn changes_from(&self, other: &Self) -> Vec<(Permission, PermissionStatus)> {
        other
            .iter()
            .filter(|(permission, status)| self.get(*permission) != *status)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Permission, PermissionStatus)> + '_ {
        self.0.iter().map(|(p, s)| (*p, *s))
    }
}

impl Default for PermissionStatusMap {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de> Deserialize<'de> for PermissionStatusMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<Permission, PermissionStatus>::deserialize(deserializer)?;
        Ok(Self::from_partial(entries))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_map_is_total_and_unasked() {
        let map = PermissionStatusMap::new();
        assert_eq!(map.iter().count(), Permission::ALL.len());
        for permission in Permission::ALL {
            assert_eq!(map.get(permission), PermissionStatus::Unasked);
        }
    }

    #[test]
    fn set_reports_change() {
        let mut map = PermissionStatusMap::new();
        assert!(map.set(Permission::Bluetooth, PermissionStatus::Denied));
        assert!(!map.set(Permission::Bluetooth, PermissionStatus::Denied));
        assert_eq!(map.get(Permission::Bluetooth), PermissionStatus::Denied);
        assert_eq!(map.get(Permission::Microphone), PermissionStatus::Unasked);
    }

    #[test]
    fn changes_from_lists_only_differences() {
        let current = PermissionStatusMap::from_partial([(
            Permission::Bluetooth,
            PermissionStatus::Denied,
        )]);
        let next = PermissionStatusMap::uniform(PermissionStatus::Denied);
        assert_eq!(
            current.changes_from(&next),
            vec![(Permission::Microphone, PermissionStatus::Denied)]
        );
        assert!(next.changes_from(&next).is_empty());
    }

    #[test]
    fn partial_json_is_filled_with_unasked() {
        let map: PermissionStatusMap = serde_json::from_str(r#"{"microphone":"granted"}"#).unwrap();
        assert_eq!(map.get(Permission::Microphone), PermissionStatus::Granted);
        assert_eq!(map.get(Permission::Bluetooth), PermissionStatus::Unasked);
    }

    #[test]
    fn serializes_with_lowercase_keys() {
        let json = serde_json::to_string(&PermissionStatusMap::uniform(PermissionStatus::Denied))
            .unwrap();
        assert_eq!(json, r#"{"bluetooth":"denied","microphone":"denied"}"#);
    }

    #[test]
    fn parses_names() {
        assert_eq!("bluetooth".parse::<Permission>().unwrap(), Permission::Bluetooth);
        assert_eq!("revoked".parse::<PermissionStatus>().unwrap(), PermissionStatus::Revoked);
        assert!("camera".parse::<Permission>().is_err());
        assert!("maybe".parse::<PermissionStatus>().is_err());
    }
}
