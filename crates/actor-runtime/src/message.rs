//! # Envelopes
//!
//! A mailbox carries [`Envelope`]s. Each message is boxed together with the
//! code that dispatches it to the right handler impl, so one channel can carry
//! every message type an actor accepts while the match between a message and
//! its handler is still decided by the compiler.

use crate::actor::{Actor, Handler, Notifiable};
use crate::context::Context;
use crate::logging::short_type_name;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::trace;

/// Type alias for the one-shot reply channel of a request.
pub(crate) type Response<R> = oneshot::Sender<R>;

/// One item in an actor's mailbox.
pub(crate) enum Envelope<A: Actor> {
    Message(Box<dyn EnvelopeProxy<A>>),
    /// Queued stop: ends the loop once every earlier message was handled.
    Stop,
}

/// A boxed message that knows how to dispatch itself to `A`.
pub(crate) trait EnvelopeProxy<A: Actor>: Send {
    /// Short type name of the message, for logs.
    fn kind(&self) -> &'static str;

    fn dispatch<'a>(self: Box<Self>, actor: &'a mut A, ctx: &'a Context<A>) -> BoxFuture<'a, ()>;
}

/// A message whose sender awaits the handler's response.
pub(crate) struct Request<M, R> {
    pub(crate) msg: M,
    pub(crate) respond_to: Response<R>,
}

impl<A, M, R> EnvelopeProxy<A> for Request<M, R>
where
    A: Handler<M, Response = R>,
    M: Send + 'static,
    R: Send + 'static,
{
    fn kind(&self) -> &'static str {
        short_type_name::<M>()
    }

    fn dispatch<'a>(self: Box<Self>, actor: &'a mut A, ctx: &'a Context<A>) -> BoxFuture<'a, ()> {
        let Request { msg, respond_to } = *self;
        Box::pin(async move {
            let response = <A as Handler<M>>::handle(actor, msg, ctx).await;
            if respond_to.send(response).is_err() {
                // The caller gave up (dropped or timed out); the turn still counts.
                trace!(message = short_type_name::<M>(), "Reply discarded");
            }
        })
    }
}

/// A fire-and-forget message.
pub(crate) struct Notification<M> {
    pub(crate) msg: M,
}

impl<A, M> EnvelopeProxy<A> for Notification<M>
where
    A: Notifiable<M>,
    M: Send + 'static,
{
    fn kind(&self) -> &'static str {
        short_type_name::<M>()
    }

    fn dispatch<'a>(self: Box<Self>, actor: &'a mut A, ctx: &'a Context<A>) -> BoxFuture<'a, ()> {
        let Notification { msg } = *self;
        Box::pin(async move { <A as Notifiable<M>>::notify(actor, msg, ctx).await })
    }
}
