//! # Actor & Handler Traits
//!
//! An actor is plain state plus one handler impl per message type it accepts.
//! Dispatch is type-directed and checked by the compiler: an
//! [`Address<A>`](crate::Address) only offers `send::<M>` when `A: Handler<M>`
//! and `notify::<M>` when `A: Notifiable<M>`, so a message without a handler
//! cannot be enqueued in the first place.
//!
//! ## Requests and Notifications
//!
//! - [`Handler<M>`]: the caller awaits a typed [`Handler::Response`]. Business
//!   failures belong in the response (e.g. `Result<T, MyError>`); they go back
//!   to the caller and the Context keeps running.
//! - [`Notifiable<M>`]: fire-and-forget. The caller only learns whether the
//!   message was accepted into the mailbox.
//!
//! Every handler gets `&mut self` for the duration of its turn and the actor's
//! [`Context`], which hands out the actor's own Address and lets the handler
//! end the run loop.
//!
//! ```rust
//! use actor_runtime::{Actor, Context, Handler, Notifiable};
//! use async_trait::async_trait;
//!
//! struct Counter { value: u64 }
//! struct Increment;
//! struct GetValue;
//!
//! impl Actor for Counter {}
//!
//! #[async_trait]
//! impl Notifiable<Increment> for Counter {
//!     async fn notify(&mut self, _: Increment, _: &Context<Self>) {
//!         self.value += 1;
//!     }
//! }
//!
//! #[async_trait]
//! impl Handler<GetValue> for Counter {
//!     type Response = u64;
//!     async fn handle(&mut self, _: GetValue, _: &Context<Self>) -> u64 {
//!         self.value
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Context::new();
//!     let address = context.address();
//!     tokio::spawn(context.run(Counter { value: 0 }));
//!
//!     address.notify(Increment).await.unwrap();
//!     assert_eq!(address.send(GetValue).await.unwrap(), 1);
//! }
//! ```

use crate::context::Context;
use async_trait::async_trait;

/// Marker trait for state driven by a [`Context`], with optional lifecycle hooks.
#[async_trait]
pub trait Actor: Send + Sized + 'static {
    /// Runs inside the Context before the first message is handled.
    ///
    /// This is where an actor typically spawns its owned tasks with
    /// `ctx.address()` as their only link back to the state.
    async fn started(&mut self, _ctx: &Context<Self>) {}

    /// Runs after the loop ended and the mailbox was closed, right before the
    /// actor (and every task set it owns) is dropped.
    async fn stopped(&mut self) {}
}

/// Handles a request of type `M` and produces a typed response.
#[async_trait]
pub trait Handler<M: Send + 'static>: Actor {
    type Response: Send + 'static;

    async fn handle(&mut self, msg: M, ctx: &Context<Self>) -> Self::Response;
}

/// Handles a notification of type `M`. Nothing is sent back.
#[async_trait]
pub trait Notifiable<M: Send + 'static>: Actor {
    async fn notify(&mut self, msg: M, ctx: &Context<Self>);
}
