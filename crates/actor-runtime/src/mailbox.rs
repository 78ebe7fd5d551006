//! # Mailbox
//!
//! The FIFO queue feeding one Context. Both flavours are a single Tokio MPSC
//! channel, so the handling order of one mailbox is exactly the order in which
//! envelopes were enqueued, across every sender combined.
//!
//! - **Unbounded** (default): enqueueing never waits.
//! - **Bounded**: enqueueing suspends the sender until capacity frees.

use crate::actor::Actor;
use crate::config::MailboxConfig;
use crate::error::ActorError;
use crate::message::Envelope;
use tokio::sync::mpsc;

pub(crate) fn channel<A: Actor>(config: MailboxConfig) -> (MailboxSender<A>, MailboxReceiver<A>) {
    match config.capacity {
        Some(capacity) => {
            let (sender, receiver) = mpsc::channel(capacity);
            (
                MailboxSender::Bounded(sender),
                MailboxReceiver::Bounded(receiver),
            )
        }
        None => {
            let (sender, receiver) = mpsc::unbounded_channel();
            (
                MailboxSender::Unbounded(sender),
                MailboxReceiver::Unbounded(receiver),
            )
        }
    }
}

pub(crate) enum MailboxSender<A: Actor> {
    Bounded(mpsc::Sender<Envelope<A>>),
    Unbounded(mpsc::UnboundedSender<Envelope<A>>),
}

impl<A: Actor> Clone for MailboxSender<A> {
    fn clone(&self) -> Self {
        match self {
            MailboxSender::Bounded(s) => MailboxSender::Bounded(s.clone()),
            MailboxSender::Unbounded(s) => MailboxSender::Unbounded(s.clone()),
        }
    }
}

impl<A: Actor> MailboxSender<A> {
    /// Enqueues an envelope, waiting for capacity on a bounded mailbox.
    pub(crate) async fn push(&self, envelope: Envelope<A>) -> Result<(), ActorError> {
        match self {
            MailboxSender::Bounded(s) => s.send(envelope).await.map_err(|_| ActorError::Closed),
            MailboxSender::Unbounded(s) => s.send(envelope).map_err(|_| ActorError::Closed),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        match self {
            MailboxSender::Bounded(s) => s.is_closed(),
            MailboxSender::Unbounded(s) => s.is_closed(),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakMailboxSender<A> {
        match self {
            MailboxSender::Bounded(s) => WeakMailboxSender::Bounded(s.downgrade()),
            MailboxSender::Unbounded(s) => WeakMailboxSender::Unbounded(s.downgrade()),
        }
    }
}

/// Sender that does not keep the mailbox open.
pub(crate) enum WeakMailboxSender<A: Actor> {
    Bounded(mpsc::WeakSender<Envelope<A>>),
    Unbounded(mpsc::WeakUnboundedSender<Envelope<A>>),
}

impl<A: Actor> Clone for WeakMailboxSender<A> {
    fn clone(&self) -> Self {
        match self {
            WeakMailboxSender::Bounded(s) => WeakMailboxSender::Bounded(s.clone()),
            WeakMailboxSender::Unbounded(s) => WeakMailboxSender::Unbounded(s.clone()),
        }
    }
}

impl<A: Actor> WeakMailboxSender<A> {
    pub(crate) fn upgrade(&self) -> Option<MailboxSender<A>> {
        match self {
            WeakMailboxSender::Bounded(s) => s.upgrade().map(MailboxSender::Bounded),
            WeakMailboxSender::Unbounded(s) => s.upgrade().map(MailboxSender::Unbounded),
        }
    }
}

pub(crate) enum MailboxReceiver<A: Actor> {
    Bounded(mpsc::Receiver<Envelope<A>>),
    Unbounded(mpsc::UnboundedReceiver<Envelope<A>>),
}

impl<A: Actor> MailboxReceiver<A> {
    /// Next envelope, or `None` once every sender is gone and the queue is empty.
    pub(crate) async fn recv(&mut self) -> Option<Envelope<A>> {
        match self {
            MailboxReceiver::Bounded(r) => r.recv().await,
            MailboxReceiver::Unbounded(r) => r.recv().await,
        }
    }

    /// Rejects further envelopes. Queued ones stay until the receiver drops.
    pub(crate) fn close(&mut self) {
        match self {
            MailboxReceiver::Bounded(r) => r.close(),
            MailboxReceiver::Unbounded(r) => r.close(),
        }
    }

    /// Number of envelopes still queued.
    pub(crate) fn len(&self) -> usize {
        match self {
            MailboxReceiver::Bounded(r) => r.len(),
            MailboxReceiver::Unbounded(r) => r.len(),
        }
    }
}
