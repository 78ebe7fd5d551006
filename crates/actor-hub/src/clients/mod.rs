//! Typed front ends that hide message passing from callers outside the actors.

mod counter_client;
mod settings_client;

pub use counter_client::CounterClient;
pub use settings_client::SettingsClient;
