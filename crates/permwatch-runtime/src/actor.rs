//! Actor addressing shared by every actor in the runtime.
//!
//! Each actor owns an unbounded mpsc mailbox and is addressed through a
//! [`Recipient`], a cloneable, type-erased handle that knows which actor it
//! points at. Two recipients are equal when they address the same actor.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::error::ActorError;

/// Identity of a spawned actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Deliver<M> = dyn Fn(M) -> bool + Send + Sync;

/// Address of an actor mailbox accepting messages of type `M`.
pub struct Recipient<M> {
    id: ActorId,
    deliver: Arc<Deliver<M>>,
}

impl<M: Send + 'static> Recipient<M> {
    /// Address a mailbox that takes `M` directly.
    pub fn new(id: ActorId, tx: mpsc::UnboundedSender<M>) -> Self {
        Self {
            id,
            deliver: Arc::new(move |msg| tx.send(msg).is_ok()),
        }
    }

    /// Address a mailbox of a wider message type, wrapping each `M` with `map`.
    pub fn mapped<T: Send + 'static>(
        id: ActorId,
        tx: mpsc::UnboundedSender<T>,
        map: fn(M) -> T,
    ) -> Self {
        Self {
            id,
            deliver: Arc::new(move |msg| tx.send(map(msg)).is_ok()),
        }
    }

    /// Like [`mapped`](Self::mapped), but does not keep the mailbox open.
    /// Delivery fails once every strong sender is gone.
    pub fn weak_mapped<T: Send + 'static>(
        id: ActorId,
        tx: mpsc::WeakUnboundedSender<T>,
        map: fn(M) -> T,
    ) -> Self {
        Self {
            id,
            deliver: Arc::new(move |msg| tx.upgrade().is_some_and(|tx| tx.send(map(msg)).is_ok())),
        }
    }

    /// A fresh mailbox with its recipient, for owners that are not actors
    /// themselves (tests, the CLI).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<M>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ActorId::new(), tx), rx)
    }

    pub fn send(&self, msg: M) -> Result<(), ActorError> {
        if (self.deliver)(msg) {
            Ok(())
        } else {
            Err(ActorError::MailboxClosed { actor: self.id })
        }
    }
}

impl<M> Recipient<M> {
    pub const fn id(&self) -> ActorId {
        self.id
    }
}

impl<M> Clone for Recipient<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<M> fmt::Debug for Recipient<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient").field("id", &self.id).finish()
    }
}

impl<M> PartialEq for Recipient<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> Eq for Recipient<M> {}

impl<M> Hash for Recipient<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Deliver `msg` to an optional parent.
///
/// A missing parent or a closed parent mailbox is logged and otherwise
/// ignored; neither is an error for the sending actor.
pub fn send_to_parent<M: Send + fmt::Debug + 'static>(
    parent: Option<&Recipient<M>>,
    msg: M,
    sender: ActorId,
) {
    let Some(parent) = parent else {
        warn!(%sender, event = ?msg, "Attempt to send an event to a non-existent parent");
        return;
    };
    if let Err(e) = parent.send(msg) {
        warn!(%sender, parent = %parent.id(), error = %e, "Parent unreachable, event dropped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Wide {
        Number(u32),
    }

    #[tokio::test]
    async fn mapped_recipient_wraps_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let recipient = Recipient::mapped(ActorId::new(), tx, Wide::Number);
        recipient.send(7).unwrap();
        assert_eq!(rx.recv().await, Some(Wide::Number(7)));
    }

    #[tokio::test]
    async fn weak_recipient_fails_after_senders_drop() {
        let (tx, rx) = mpsc::unbounded_channel::<Wide>();
        let recipient = Recipient::weak_mapped(ActorId::new(), tx.downgrade(), Wide::Number);
        recipient.send(1).unwrap();
        drop(tx);
        assert!(matches!(
            recipient.send(2),
            Err(ActorError::MailboxClosed { .. })
        ));
        drop(rx);
    }

    #[tokio::test]
    async fn equality_is_by_actor_identity() {
        let (a, _rx_a) = Recipient::<u32>::channel();
        let (b, _rx_b) = Recipient::<u32>::channel();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn send_to_missing_parent_is_a_no_op() {
        send_to_parent::<u32>(None, 1, ActorId::new());
        let (parent, rx) = Recipient::<u32>::channel();
        drop(rx);
        send_to_parent(Some(&parent), 1, ActorId::new());
    }
}
