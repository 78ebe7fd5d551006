//! # System Lifecycle & Orchestration
//!
//! Individual actors are simple; wiring them together is where the complexity
//! lives. [`HubSystem`] is the conductor of the hub:
//!
//! 1. **Creation**: two keyed registries (counters by id, settings by user),
//!    one supervised [`Pipeline`](crate::pipeline::Pipeline) and one
//!    [`EventBridge`](actor_runtime::EventBridge) shared by all of them.
//! 2. **Resolution**: [`HubSystem::counter`] and [`HubSystem::settings`] hand
//!    out typed clients, creating the actor on first use.
//! 3. **Outer layer**: [`HubSystem::events`] feeds a UI or socket, and
//!    [`HubSystem::command_router`] routes its commands back in.
//! 4. **Shutdown**: queued stops for the registries and the pipeline, each of
//!    which tears down what it owns.
//!
//! ## Usage
//!
//! ```rust
//! use actor_hub::lifecycle::HubSystem;
//! use actor_runtime::{mock::MemoryStorage, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let system = HubSystem::new(RuntimeConfig::default(), MemoryStorage::new().shared());
//!
//!     let lobby = system.counter("lobby").await.unwrap();
//!     lobby.increment().await.unwrap();
//!     assert_eq!(lobby.value().await.unwrap(), 1);
//!
//!     system.shutdown().await.unwrap();
//! }
//! ```
//!
//! ## Observability
//!
//! Call [`setup_tracing`](actor_runtime::logging::setup_tracing) once at
//! program start:
//!
//! ```bash
//! RUST_LOG=info cargo run      # lifecycle and supervision
//! RUST_LOG=debug cargo run     # every request and event
//! ```

mod hub_system;

pub use hub_system::*;
