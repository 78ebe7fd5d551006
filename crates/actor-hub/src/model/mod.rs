//! Plain data exchanged between the hub's actors and the outer layer.

pub mod events;
pub mod preferences;

pub use events::*;
pub use preferences::*;
