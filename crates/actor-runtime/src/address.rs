//! # Address & Recipient
//!
//! An [`Address`] is the cloneable, non-owning handle used to put messages into
//! a Context's mailbox. Cloning is free and unlimited. Holding an Address keeps
//! the mailbox open but never keeps a terminated actor alive: once the run loop
//! ends, every clone reports [`ActorError::Closed`].
//!
//! A [`WeakAddress`] is the non-owning form used for back-references (a
//! child's monitor reporting to its parent): it does not keep the mailbox
//! open.
//!
//! A [`Recipient<M>`] erases the actor type and keeps only "accepts
//! notification `M`", which is what subscriber lists and dependency-update
//! targets need.

use crate::actor::{Actor, Handler, Notifiable};
use crate::context::ActorId;
use crate::error::ActorError;
use crate::logging::short_type_name;
use crate::mailbox::{MailboxSender, WeakMailboxSender};
use crate::message::{Envelope, Notification, Request};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Handle for sending messages to one actor.
///
/// `Address::default()` is a placeholder that is closed from the start; it is
/// useful while a real dependency has not been wired yet.
pub struct Address<A: Actor> {
    id: Option<ActorId>,
    sender: Option<MailboxSender<A>>,
}

impl<A: Actor> Clone for Address<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

impl<A: Actor> Default for Address<A> {
    fn default() -> Self {
        Self {
            id: None,
            sender: None,
        }
    }
}

/// Two Addresses are equal when they point at the same Context.
impl<A: Actor> PartialEq for Address<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A: Actor> Eq for Address<A> {}

impl<A: Actor> fmt::Debug for Address<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("actor", &short_type_name::<A>())
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<A: Actor> Address<A> {
    pub(crate) fn new(id: ActorId, sender: Option<MailboxSender<A>>) -> Self {
        Self {
            id: Some(id),
            sender,
        }
    }

    /// Identity of the target Context, `None` for a placeholder.
    pub fn id(&self) -> Option<ActorId> {
        self.id
    }

    /// True once the target Context has terminated (or for a placeholder).
    pub fn is_closed(&self) -> bool {
        self.sender.as_ref().map_or(true, MailboxSender::is_closed)
    }

    fn sender(&self) -> Result<&MailboxSender<A>, ActorError> {
        self.sender.as_ref().ok_or(ActorError::Closed)
    }

    /// Sends a request and waits for the handler's response.
    ///
    /// # Errors
    ///
    /// [`ActorError::Closed`] if the Context terminated before or while the
    /// request was queued.
    pub async fn send<M>(&self, msg: M) -> Result<A::Response, ActorError>
    where
        A: Handler<M>,
        M: Send + 'static,
    {
        let (respond_to, response) = oneshot::channel();
        self.sender()?
            .push(Envelope::Message(Box::new(Request { msg, respond_to })))
            .await?;
        response.await.map_err(|_| ActorError::Closed)
    }

    /// Like [`send`](Self::send), but gives up after `timeout`.
    ///
    /// The handler is not told; it may still run and reply into the void.
    pub async fn send_timeout<M>(
        &self,
        msg: M,
        timeout: Duration,
    ) -> Result<A::Response, ActorError>
    where
        A: Handler<M>,
        M: Send + 'static,
    {
        tokio::time::timeout(timeout, self.send(msg))
            .await
            .map_err(|_| ActorError::TimedOut)?
    }

    /// Sends a request whose handler answers `Result<T, E>` and flattens the
    /// business error into [`ActorError::HandlerFailed`].
    pub async fn call<M, T, E>(&self, msg: M) -> Result<T, ActorError>
    where
        A: Handler<M, Response = Result<T, E>>,
        M: Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.send(msg).await?.map_err(ActorError::handler_failed)
    }

    /// Enqueues a notification and returns once the mailbox accepted it.
    pub async fn notify<M>(&self, msg: M) -> Result<(), ActorError>
    where
        A: Notifiable<M>,
        M: Send + 'static,
    {
        self.sender()?
            .push(Envelope::Message(Box::new(Notification { msg })))
            .await
    }

    /// Queues a stop behind every message already in the mailbox.
    pub async fn stop(&self) -> Result<(), ActorError> {
        self.sender()?.push(Envelope::Stop).await
    }

    /// Non-owning form of this Address.
    pub fn downgrade(&self) -> WeakAddress<A> {
        WeakAddress {
            id: self.id,
            sender: self.sender.as_ref().map(MailboxSender::downgrade),
        }
    }

    /// Erases the actor type, keeping only the ability to receive `M`.
    pub fn recipient<M>(&self) -> Recipient<M>
    where
        A: Notifiable<M>,
        M: Send + 'static,
    {
        Recipient {
            id: self.id,
            target: Arc::new(self.clone()),
        }
    }
}

/// An Address that does not keep the target's mailbox open.
pub struct WeakAddress<A: Actor> {
    id: Option<ActorId>,
    sender: Option<WeakMailboxSender<A>>,
}

impl<A: Actor> Clone for WeakAddress<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

impl<A: Actor> fmt::Debug for WeakAddress<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakAddress")
            .field("actor", &short_type_name::<A>())
            .field("id", &self.id)
            .finish()
    }
}

impl<A: Actor> WeakAddress<A> {
    /// Returns a live Address, or `None` once no strong Address is left.
    pub fn upgrade(&self) -> Option<Address<A>> {
        let sender = self.sender.as_ref()?.upgrade()?;
        Some(Address {
            id: self.id,
            sender: Some(sender),
        })
    }
}

trait NotifyTarget<M>: Send + Sync {
    fn notify(&self, msg: M) -> BoxFuture<'_, Result<(), ActorError>>;
    fn is_closed(&self) -> bool;
}

impl<A, M> NotifyTarget<M> for Address<A>
where
    A: Notifiable<M>,
    M: Send + 'static,
{
    fn notify(&self, msg: M) -> BoxFuture<'_, Result<(), ActorError>> {
        Box::pin(Address::notify(self, msg))
    }

    fn is_closed(&self) -> bool {
        Address::is_closed(self)
    }
}

/// Any actor that is [`Notifiable<M>`], behind one type.
pub struct Recipient<M> {
    id: Option<ActorId>,
    target: Arc<dyn NotifyTarget<M>>,
}

impl<M> Clone for Recipient<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            target: Arc::clone(&self.target),
        }
    }
}

impl<M> PartialEq for Recipient<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> fmt::Debug for Recipient<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient")
            .field("message", &short_type_name::<M>())
            .field("id", &self.id)
            .finish()
    }
}

impl<M: Send + 'static> Recipient<M> {
    pub fn id(&self) -> Option<ActorId> {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.target.is_closed()
    }

    pub async fn notify(&self, msg: M) -> Result<(), ActorError> {
        self.target.notify(msg).await
    }
}
