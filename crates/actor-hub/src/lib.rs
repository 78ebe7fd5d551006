//! # Actor Hub
//!
//! An application assembled from the `actor_runtime` building blocks:
//!
//! - **[counter_actor]**: keyed counters with subscribers and an optional ticker.
//! - **[settings_actor]**: per-user preferences persisted through a [`Storage`](actor_runtime::Storage).
//! - **[pipeline]**: a supervised source/sink pair that survives source crashes.
//! - **[clients]**: typed wrappers that hide message passing.
//! - **[lifecycle]**: the [`HubSystem`](lifecycle::HubSystem) that wires it all together.
//! - **[storage]**: a file-backed [`Storage`](actor_runtime::Storage).

pub mod clients;
pub mod counter_actor;
pub mod lifecycle;
pub mod model;
pub mod pipeline;
pub mod settings_actor;
pub mod storage;
