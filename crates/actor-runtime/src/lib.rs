//! # Actor Runtime
//!
//! This crate provides the building blocks for stateful, concurrent actor
//! systems on Tokio: isolated actors driven by a mailbox, typed message
//! dispatch, owned background tasks, supervision with restarts, keyed actor
//! registries, change propagation and storage-backed state.
//!
//! ## Why Actors?
//!
//! - Isolated state: only the actor's own run loop ever touches it, one message
//!   at a time, so no handler needs a lock.
//! - Message passing: actors talk through cloneable [`Address`]es.
//! - Clear lifetimes: a [`Context`] owns its actor, the actor owns its tasks
//!   and its children, and teardown flows down that tree.
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model)
//! - [Actors with Tokio](https://ryhl.io/blog/actors-with-tokio/)
//!
//! ## Architecture Overview
//!
//! | Layer | Types | Module |
//! |-------|-------|--------|
//! | Execution | [`Context`], [`ExitReason`] | [`context`] |
//! | Interface | [`Address`], [`WeakAddress`], [`Recipient`] | [`address`] |
//! | Behaviour | [`Actor`], [`Handler`], [`Notifiable`] | [`actor`] |
//! | Background work | [`OwnedTasks`], [`TaskKey`], [`TaskOutcome`] | [`tasks`] |
//! | Structure | [`Supervisor`], [`ChildSlot`], [`RegistryHandle`] | [`supervisor`], [`registry`] |
//! | Patterns | [`Subscribers`], [`Persistent`] | [`reactive`], [`persistent`] |
//! | Outer layer | [`EventBridge`], [`CommandRouter`] | [`bridge`] |
//!
//! ## Quick Start
//!
//! ```rust
//! use actor_runtime::{Actor, Context, Handler, Notifiable, OwnedTasks, Address};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct Clock {
//!     ticks: u64,
//!     _tasks: OwnedTasks,
//! }
//!
//! struct Tick;
//! struct Ticks;
//!
//! #[async_trait]
//! impl Actor for Clock {
//!     async fn started(&mut self, ctx: &Context<Self>) {
//!         // The task only knows the Address, never the state.
//!         let me = ctx.address();
//!         self._tasks.spawn(async move {
//!             let mut every = tokio::time::interval(Duration::from_millis(5));
//!             loop {
//!                 every.tick().await;
//!                 if me.notify(Tick).await.is_err() {
//!                     break;
//!                 }
//!             }
//!         });
//!     }
//! }
//!
//! #[async_trait]
//! impl Notifiable<Tick> for Clock {
//!     async fn notify(&mut self, _: Tick, _: &Context<Self>) {
//!         self.ticks += 1;
//!     }
//! }
//!
//! #[async_trait]
//! impl Handler<Ticks> for Clock {
//!     type Response = u64;
//!     async fn handle(&mut self, _: Ticks, _: &Context<Self>) -> u64 {
//!         self.ticks
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Context::new();
//!     let address: Address<Clock> = context.address();
//!     let running = context.start(Clock { ticks: 0, _tasks: OwnedTasks::new() });
//!
//!     tokio::time::sleep(Duration::from_millis(30)).await;
//!     assert!(address.send(Ticks).await.unwrap() > 0);
//!
//!     // Stopping drops the actor, and with it the ticker task.
//!     address.stop().await.unwrap();
//!     running.await.unwrap().unwrap();
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Each Context runs in its own Tokio task.
//! - Messages to one mailbox are handled **sequentially** in enqueue order.
//! - Different actors run in **parallel**; no order holds across mailboxes.
//! - A `send` from A to B while B `send`s back to A deadlocks. Break such
//!   cycles with `notify`.
//!
//! ## Testing
//!
//! The [`mock`] module provides an in-memory [`Storage`](persistent::Storage)
//! with failure injection and a [`Recorder`](mock::Recorder) probe actor for
//! asserting what an actor broadcast.

pub mod actor;
pub mod address;
pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
mod mailbox;
mod message;
pub mod mock;
pub mod persistent;
pub mod reactive;
pub mod registry;
pub mod supervisor;
pub mod tasks;

// Re-export core types for convenience
pub use actor::{Actor, Handler, Notifiable};
pub use address::{Address, Recipient, WeakAddress};
pub use bridge::{Command, CommandRouter, EventBridge};
pub use config::{MailboxConfig, RuntimeConfig};
pub use context::{ActorId, Context};
pub use error::{ActorError, ExitReason, StorageError};
pub use persistent::{Persistent, Storage};
pub use reactive::{Broadcast, Subscribers};
pub use registry::{Registry, RegistryHandle};
pub use supervisor::{ChildExited, ChildSlot, DependencyUpdate, RestartPolicy, Supervised, Supervisor};
pub use tasks::{OwnedTasks, TaskKey, TaskOutcome};
