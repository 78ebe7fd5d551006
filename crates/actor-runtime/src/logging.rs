//! # Observability
//!
//! Every Context logs its lifecycle with structured fields:
//!
//! - `actor`: the short type name of the actor (e.g. `Counter`)
//! - `actor_id`: the numeric id of its Context
//! - `role` / `generation`: on supervision events
//! - `key`: on registry events
//!
//! ```bash
//! RUST_LOG=info cargo run            # lifecycle only
//! RUST_LOG=debug cargo run           # plus every dispatched message kind
//! RUST_LOG=actor_runtime=trace cargo run
//! ```

/// Initializes the tracing subscriber, filtered by `RUST_LOG`.
///
/// Call once at program start. Tests should not call it.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Short type name used as the `actor` field, e.g. `Counter` instead of
/// `actor_hub::counter::Counter`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
