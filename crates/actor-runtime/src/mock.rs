//! # Test Doubles
//!
//! Two helpers for tests, usable from this crate and from any application crate
//! built on it:
//!
//! | Helper | Stands in for | Typical use |
//! |--------|---------------|-------------|
//! | [`MemoryStorage`] | a real [`Storage`] backend | persistent actors, failure injection |
//! | [`Recorder<M>`] | a subscriber or dependent actor | asserting what an actor broadcast |
//!
//! ## MemoryStorage
//!
//! An in-memory map with switchable failures and call counters. Clones share
//! the same map, so a test can keep one clone and hand
//! [`shared()`](MemoryStorage::shared) to the actor under test.
//!
//! ```rust
//! use actor_runtime::mock::MemoryStorage;
//! use actor_runtime::persistent::Persistent;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = MemoryStorage::new();
//!     let mut hits = Persistent::load("hits", storage.shared(), || 0u32).await;
//!
//!     storage.fail_saves(true);
//!     assert!(hits.mutate(|n| *n += 1).await.is_err());
//!     assert_eq!(*hits.get(), 1);
//!     assert_eq!(storage.save_count(), 1);
//! }
//! ```
//!
//! ## Recorder
//!
//! A probe actor that keeps every notification of type `M` it receives.
//! [`RecorderProbe::wait_for`] suspends until at least `n` arrived, so tests
//! never sleep-and-hope.
//!
//! ```rust
//! use actor_runtime::mock::Recorder;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Tick(u32);
//!
//! #[tokio::main]
//! async fn main() {
//!     let (probe, address) = Recorder::<Tick>::spawn();
//!     address.notify(Tick(1)).await.unwrap();
//!     address.notify(Tick(2)).await.unwrap();
//!     assert_eq!(probe.wait_for(2).await, vec![Tick(1), Tick(2)]);
//! }
//! ```

use crate::actor::{Actor, Notifiable};
use crate::address::Address;
use crate::context::{lock, Context};
use crate::error::StorageError;
use crate::persistent::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// How long [`RecorderProbe::wait_for`] waits before giving up.
const WAIT_LIMIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct MemoryInner {
    data: Mutex<HashMap<String, Vec<u8>>>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    saves: AtomicUsize,
    loads: AtomicUsize,
}

/// In-memory [`Storage`] with failure injection.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// This storage as the trait object persistent actors take.
    pub fn shared(&self) -> Arc<dyn Storage> {
        Arc::new(self.clone())
    }

    /// Makes every following `save` fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `load` fail with a backend error.
    pub fn fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Number of `save` calls, failed ones included.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.inner.loads.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.inner.data).get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        lock(&self.inner.data).insert(key.into(), bytes);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected save failure for {key}")));
        }
        lock(&self.inner.data).insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.loads.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected load failure for {key}")));
        }
        self.get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.inner.data)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(lock(&self.inner.data).contains_key(key))
    }
}

/// Probe actor that records every `M` it is notified of.
pub struct Recorder<M> {
    seen: watch::Sender<Vec<M>>,
}

impl<M: Clone + Send + Sync + 'static> Recorder<M> {
    /// Starts a recorder and returns its probe together with its Address.
    pub fn spawn() -> (RecorderProbe<M>, Address<Recorder<M>>) {
        let (seen, receiver) = watch::channel(Vec::new());
        let context = Context::new();
        let address = context.address();
        context.start(Recorder { seen });
        (RecorderProbe { receiver }, address)
    }
}

impl<M: Send + Sync + 'static> Actor for Recorder<M> {}

#[async_trait]
impl<M: Send + Sync + 'static> Notifiable<M> for Recorder<M> {
    async fn notify(&mut self, msg: M, _: &Context<Self>) {
        self.seen.send_modify(|seen| seen.push(msg));
    }
}

/// Read side of a [`Recorder`].
#[derive(Clone)]
pub struct RecorderProbe<M> {
    receiver: watch::Receiver<Vec<M>>,
}

impl<M: Clone + Send + Sync + 'static> RecorderProbe<M> {
    /// Everything recorded so far.
    pub fn recorded(&self) -> Vec<M> {
        self.receiver.borrow().clone()
    }

    /// Waits until at least `n` messages were recorded and returns all of them.
    ///
    /// Gives up after a few seconds and returns what arrived, so a missing
    /// message shows up as a failed assertion instead of a hung test.
    pub async fn wait_for(&self, n: usize) -> Vec<M> {
        let mut receiver = self.receiver.clone();
        let timed_out = tokio::time::timeout(WAIT_LIMIT, receiver.wait_for(|seen| seen.len() >= n))
            .await
            .is_err();
        if timed_out {
            warn!(expected = n, "Recorder timed out");
        }
        self.recorded()
    }
}
