//! # Persistent State
//!
//! [`Persistent<S>`] wraps an actor's state with a [`Storage`] collaborator.
//!
//! - [`Persistent::load`] is awaited while the actor is built. Stored bytes
//!   seed the state; any failure, "not found" included, falls back to the
//!   initial state the caller provides. Actors built by a synchronous factory
//!   use [`Persistent::unloaded`] and call [`Persistent::reload`] in
//!   `Actor::started` instead.
//! - [`Persistent::mutate`] applies a change, serializes the new state as JSON
//!   and saves it under the same key. A failed save keeps the change in memory
//!   and is reported as [`ActorError::PersistFailed`]; the actor keeps running.
//!
//! The byte layout is the storage collaborator's business. This wrapper only
//! hands it whatever `serde_json` produced.

use crate::error::{ActorError, StorageError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key/value store used by persistent actors.
///
/// Every call is independently awaitable from any actor's turn and must not
/// block other actors.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// State of type `S` mirrored to storage under one key.
pub struct Persistent<S> {
    key: String,
    state: S,
    storage: Arc<dyn Storage>,
    failed_saves: u64,
}

impl<S: fmt::Debug> fmt::Debug for Persistent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistent")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("failed_saves", &self.failed_saves)
            .finish()
    }
}

impl<S> Persistent<S>
where
    S: Serialize + DeserializeOwned + Send + Sync,
{
    /// Loads the state stored under `key`, or starts from `initial()`.
    pub async fn load(
        key: impl Into<String>,
        storage: Arc<dyn Storage>,
        initial: impl FnOnce() -> S,
    ) -> Self {
        let key = key.into();
        let state = read(&key, storage.as_ref(), initial).await;
        Self {
            key,
            state,
            storage,
            failed_saves: 0,
        }
    }

    /// Wraps `state` without reading storage.
    ///
    /// For actors built by a synchronous factory: construct with this, then
    /// [`reload`](Self::reload) in `Actor::started`, before the first message.
    pub fn unloaded(key: impl Into<String>, storage: Arc<dyn Storage>, state: S) -> Self {
        Self {
            key: key.into(),
            state,
            storage,
            failed_saves: 0,
        }
    }

    /// Replaces the in-memory state with the stored one, or with `initial()`.
    pub async fn reload(&mut self, initial: impl FnOnce() -> S) {
        self.state = read(&self.key, self.storage.as_ref(), initial).await;
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &S {
        &self.state
    }

    /// Number of saves that failed since this state was loaded.
    pub fn failed_saves(&self) -> u64 {
        self.failed_saves
    }

    /// Applies `change` and saves the result.
    ///
    /// # Errors
    ///
    /// [`ActorError::PersistFailed`] if serializing or saving failed. The
    /// change stays applied in memory either way.
    pub async fn mutate<R>(&mut self, change: impl FnOnce(&mut S) -> R) -> Result<R, ActorError> {
        let output = change(&mut self.state);
        self.save().await?;
        Ok(output)
    }

    /// Writes the current state to storage.
    pub async fn save(&mut self) -> Result<(), ActorError> {
        let result = match serde_json::to_vec(&self.state) {
            Ok(bytes) => self.storage.save(&self.key, &bytes).await,
            Err(e) => Err(StorageError::from(e)),
        };
        result.map_err(|e| {
            self.failed_saves += 1;
            warn!(
                key = %self.key,
                error = %e,
                failed_saves = self.failed_saves,
                "Persist failed, keeping in-memory state"
            );
            ActorError::PersistFailed(e)
        })
    }

    /// Deletes the stored copy and resets the in-memory state.
    pub async fn forget(&mut self, reset: S) -> Result<(), ActorError> {
        self.state = reset;
        match self.storage.delete(&self.key).await {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Delete failed");
                Err(ActorError::PersistFailed(e))
            }
        }
    }

    /// True if storage currently holds a copy of this state.
    pub async fn is_stored(&self) -> Result<bool, ActorError> {
        self.storage
            .exists(&self.key)
            .await
            .map_err(ActorError::PersistFailed)
    }
}

async fn read<S: DeserializeOwned>(key: &str, storage: &dyn Storage, initial: impl FnOnce() -> S) -> S {
    let loaded = match storage.load(key).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(StorageError::from),
        Err(e) => Err(e),
    };

    match loaded {
        Ok(state) => {
            debug!(%key, "State loaded");
            state
        }
        Err(StorageError::NotFound(_)) => {
            debug!(%key, "No stored state, starting fresh");
            initial()
        }
        Err(e) => {
            warn!(%key, error = %e, "Could not load state, starting fresh");
            initial()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryStorage;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        volume: u8,
    }

    fn dark() -> Prefs {
        Prefs {
            theme: "dark".into(),
            volume: 3,
        }
    }

    #[tokio::test]
    async fn missing_key_falls_back_to_initial() {
        let storage = MemoryStorage::new();
        let prefs = Persistent::load("prefs/u1", storage.shared(), dark).await;
        assert_eq!(prefs.get(), &dark());
        assert_eq!(storage.load_count(), 1);
    }

    #[tokio::test]
    async fn mutation_is_saved_and_reloaded() {
        let storage = MemoryStorage::new();
        let mut prefs = Persistent::load("prefs/u1", storage.shared(), Prefs::default).await;

        let volume = prefs
            .mutate(|p| {
                p.volume = 9;
                p.volume
            })
            .await
            .unwrap();
        assert_eq!(volume, 9);
        assert!(prefs.is_stored().await.unwrap());

        let reloaded = Persistent::<Prefs>::load("prefs/u1", storage.shared(), dark).await;
        assert_eq!(reloaded.get().volume, 9);
    }

    #[tokio::test]
    async fn save_failure_keeps_update_and_reports_once() {
        let storage = MemoryStorage::new();
        let mut prefs = Persistent::load("prefs/u1", storage.shared(), Prefs::default).await;

        storage.fail_saves(true);
        let err = prefs.mutate(|p| p.theme = "light".into()).await.unwrap_err();
        assert!(matches!(err, ActorError::PersistFailed(StorageError::Backend(_))));
        assert_eq!(prefs.get().theme, "light");
        assert_eq!(prefs.failed_saves(), 1);
        assert!(!prefs.is_stored().await.unwrap());

        storage.fail_saves(false);
        prefs.mutate(|p| p.volume = 1).await.unwrap();
        assert_eq!(prefs.failed_saves(), 1);
        assert!(prefs.is_stored().await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_bytes_fall_back_to_initial() {
        let storage = MemoryStorage::new();
        storage.insert("prefs/u1", b"not json".to_vec());
        let prefs = Persistent::load("prefs/u1", storage.shared(), dark).await;
        assert_eq!(prefs.get(), &dark());
    }

    #[tokio::test]
    async fn reload_reads_what_another_writer_saved() {
        let storage = MemoryStorage::new();
        let mut reader = Persistent::unloaded("prefs/u1", storage.shared(), Prefs::default());
        let mut writer = Persistent::load("prefs/u1", storage.shared(), dark).await;
        writer.mutate(|p| p.volume = 5).await.unwrap();

        assert_eq!(reader.get(), &Prefs::default());
        reader.reload(Prefs::default).await;
        assert_eq!(reader.get().volume, 5);
        assert_eq!(reader.get().theme, "dark");
    }

    #[tokio::test]
    async fn forget_deletes_stored_copy() {
        let storage = MemoryStorage::new();
        let mut prefs = Persistent::load("prefs/u1", storage.shared(), dark).await;
        prefs.save().await.unwrap();
        assert!(prefs.is_stored().await.unwrap());

        prefs.forget(Prefs::default()).await.unwrap();
        assert_eq!(prefs.get(), &Prefs::default());
        assert!(!prefs.is_stored().await.unwrap());
        // Forgetting twice is fine.
        prefs.forget(Prefs::default()).await.unwrap();
    }
}
