//! Monitor state: lifecycle region and subscriber index.

use std::collections::BTreeMap;

use permwatch_core::Permission;

use super::types::Subscriber;
use crate::actor::ActorId;

/// Whether the host application is visible to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Foreground,
    Background,
}

/// Lifecycle notifications from the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foregrounded,
    Backgrounded,
}

impl LifecycleState {
    /// Transition table for the lifecycle region.
    pub const fn transition(self, event: LifecycleEvent) -> Self {
        match (self, event) {
            (_, LifecycleEvent::Foregrounded) => Self::Foreground,
            (_, LifecycleEvent::Backgrounded) => Self::Background,
        }
    }
}

/// Independent state regions of the monitor. Each axis has its own
/// transition function; permission statuses live in the status map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorRegions {
    pub lifecycle: LifecycleState,
}

/// Subscribers per permission, unique by actor identity.
pub(crate) struct SubscriberIndex {
    sets: BTreeMap<Permission, Vec<Subscriber>>,
}

impl SubscriberIndex {
    /// Every permission mapped to an empty set.
    pub fn new() -> Self {
        Self {
            sets: Permission::ALL.into_iter().map(|p| (p, Vec::new())).collect(),
        }
    }

    /// Add `subscriber` for `permission`. Returns `false` if it was already
    /// present.
    pub fn insert(&mut self, permission: Permission, subscriber: Subscriber) -> bool {
        let set = self.sets.entry(permission).or_default();
        if set.contains(&subscriber) {
            return false;
        }
        set.push(subscriber);
        true
    }

    /// Remove an actor from every set. Returns how many sets it was in.
    pub fn remove(&mut self, actor: ActorId) -> usize {
        let mut removed = 0;
        for set in self.sets.values_mut() {
            let before = set.len();
            set.retain(|s| s.id() != actor);
            removed += before - set.len();
        }
        removed
    }

    pub fn subscribers(&self, permission: Permission) -> &[Subscriber] {
        self.sets.get(&permission).map_or(&[], Vec::as_slice)
    }

    pub fn ids(&self) -> BTreeMap<Permission, Vec<ActorId>> {
        self.sets
            .iter()
            .map(|(p, set)| (*p, set.iter().map(Subscriber::id).collect()))
            .collect()
    }
}
