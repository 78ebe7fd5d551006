//! Error types for the Settings actor.

use actor_runtime::ActorError;
use thiserror::Error;

/// Errors returned by settings requests.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The update did not set any field.
    #[error("Empty preferences update")]
    EmptyUpdate,

    /// Language codes are two lowercase ASCII letters.
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// The change was applied in memory but could not be written to storage.
    #[error("Preferences not saved: {0}")]
    NotSaved(#[source] ActorError),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunication(#[from] ActorError),
}
