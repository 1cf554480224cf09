//! Runtime error types.

use crate::actor::ActorId;
use crate::registry::{RegistryError, WellKnownId};

/// Errors surfaced by actor handles.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Mailbox of actor {actor} is closed")]
    MailboxClosed { actor: ActorId },

    #[error("Actor {actor} stopped before replying")]
    NoReply { actor: ActorId },

    #[error("Service {service} did not register within {waited_ms}ms")]
    ServiceUnavailable { service: WellKnownId, waited_ms: u64 },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
