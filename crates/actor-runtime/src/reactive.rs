//! # Reactive Propagation
//!
//! [`Subscribers`] is the set of Recipients an actor pushes its changes to.
//! The owning actor calls [`Subscribers::broadcast`] from the handler that
//! changed its state; every subscriber gets the change exactly once through
//! `notify`, and recomputes whatever it derives from the payload alone.
//!
//! A subscriber whose Context has ended is dropped from the set on the first
//! failed delivery. It never delays or aborts delivery to the others.

use crate::address::Recipient;
use crate::context::ActorId;
use futures::future::join_all;
use tracing::debug;

/// Result of one [`Subscribers::broadcast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Broadcast {
    /// Subscribers whose mailbox accepted the change.
    pub delivered: usize,
    /// Subscribers found closed and removed from the set.
    pub pruned: usize,
}

/// Recipients of change notifications of type `M`.
#[derive(Debug)]
pub struct Subscribers<M> {
    list: Vec<Recipient<M>>,
}

impl<M> Default for Subscribers<M> {
    fn default() -> Self {
        Self { list: Vec::new() }
    }
}

impl<M: Clone + Send + 'static> Subscribers<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber. Returns false if the same actor is already subscribed.
    pub fn subscribe(&mut self, recipient: Recipient<M>) -> bool {
        if self.list.iter().any(|r| *r == recipient) {
            return false;
        }
        self.list.push(recipient);
        true
    }

    pub fn unsubscribe(&mut self, id: ActorId) -> bool {
        let before = self.list.len();
        self.list.retain(|r| r.id() != Some(id));
        self.list.len() != before
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Notifies every subscriber of `change` once and prunes the closed ones.
    pub async fn broadcast(&mut self, change: M) -> Broadcast {
        let results = join_all(self.list.iter().map(|r| r.notify(change.clone()))).await;

        let mut report = Broadcast::default();
        let mut results = results.into_iter();
        self.list.retain(|_| match results.next() {
            Some(Ok(())) => {
                report.delivered += 1;
                true
            }
            _ => {
                report.pruned += 1;
                false
            }
        });

        if report.pruned > 0 {
            debug!(
                delivered = report.delivered,
                pruned = report.pruned,
                "Dropped closed subscribers"
            );
        }
        report
    }
}
