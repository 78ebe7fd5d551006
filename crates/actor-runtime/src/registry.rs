//! # Registry
//!
//! A [`Registry<K, A>`] gives every logical entity (one user id, one document
//! key) its own actor of type `A`, created lazily on first use and cached
//! afterwards.
//!
//! The registry is itself an actor. Its map is touched only during its own
//! turns, so the check-then-insert of [`RegistryHandle::get_or_create`] is a
//! single-writer critical section: any number of concurrent callers for an
//! absent key converge on one actor and equal Addresses.
//!
//! Every entry runs under a child of the registry's cancellation token.
//! Stopping the registry tears all of them down.

use crate::actor::{Actor, Handler};
use crate::address::Address;
use crate::config::MailboxConfig;
use crate::context::Context;
use crate::error::ActorError;
use crate::logging::short_type_name;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Key type accepted by a [`Registry`].
pub trait RegistryKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> RegistryKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Builds the actor for a key. It also receives the new actor's own Address.
pub type Factory<K, A> = Box<dyn FnOnce(&K, Address<A>) -> A + Send>;

/// Manager actor holding the key to Address map.
pub struct Registry<K: RegistryKey, A: Actor> {
    entries: HashMap<K, Address<A>>,
    created: u64,
    mailbox: MailboxConfig,
    cancel: CancellationToken,
}

impl<K: RegistryKey, A: Actor> Registry<K, A> {
    pub fn new(mailbox: MailboxConfig) -> Self {
        Self {
            entries: HashMap::new(),
            created: 0,
            mailbox,
            cancel: CancellationToken::new(),
        }
    }

    fn create(&mut self, key: &K, factory: Factory<K, A>) -> Address<A> {
        let context = Context::with_cancellation(self.mailbox, self.cancel.child_token());
        let address = context.address();
        context.start(factory(key, address.clone()));
        self.created += 1;
        info!(
            ?key,
            actor = short_type_name::<A>(),
            actor_id = ?address.id(),
            "Registry entry created"
        );
        address
    }

    /// Forgets every entry whose actor has ended.
    fn prune(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, address| !address.is_closed());
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, "Dropped ended registry entries");
        }
    }
}

#[async_trait]
impl<K: RegistryKey, A: Actor> Actor for Registry<K, A> {
    async fn started(&mut self, ctx: &Context<Self>) {
        self.cancel = ctx.cancellation_token().child_token();
    }

    async fn stopped(&mut self) {
        debug!(entries = self.entries.len(), "Registry tearing down entries");
        self.cancel.cancel();
        self.entries.clear();
    }
}

pub struct GetOrCreate<K, A: Actor> {
    pub key: K,
    pub factory: Factory<K, A>,
}

pub struct Lookup<K>(pub K);

pub struct Remove<K>(pub K);

/// Counts as `(live entries, actors created so far)`.
pub struct Stats;

#[async_trait]
impl<K: RegistryKey, A: Actor> Handler<GetOrCreate<K, A>> for Registry<K, A> {
    type Response = Address<A>;

    async fn handle(&mut self, msg: GetOrCreate<K, A>, _: &Context<Self>) -> Address<A> {
        if let Some(address) = self.entries.get(&msg.key) {
            if !address.is_closed() {
                return address.clone();
            }
            debug!(key = ?msg.key, "Cached actor has terminated, recreating");
        }
        self.prune();
        let address = self.create(&msg.key, msg.factory);
        self.entries.insert(msg.key, address.clone());
        address
    }
}

#[async_trait]
impl<K: RegistryKey, A: Actor> Handler<Lookup<K>> for Registry<K, A> {
    type Response = Option<Address<A>>;

    async fn handle(&mut self, msg: Lookup<K>, _: &Context<Self>) -> Option<Address<A>> {
        self.entries.get(&msg.0).filter(|a| !a.is_closed()).cloned()
    }
}

#[async_trait]
impl<K: RegistryKey, A: Actor> Handler<Remove<K>> for Registry<K, A> {
    type Response = bool;

    async fn handle(&mut self, msg: Remove<K>, _: &Context<Self>) -> bool {
        match self.entries.remove(&msg.0) {
            Some(address) => {
                // Already closed is fine: the entry is gone either way.
                let _ = address.stop().await;
                info!(key = ?msg.0, "Registry entry removed");
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl<K: RegistryKey, A: Actor> Handler<Stats> for Registry<K, A> {
    type Response = (usize, u64);

    async fn handle(&mut self, _: Stats, _: &Context<Self>) -> (usize, u64) {
        self.prune();
        (self.entries.len(), self.created)
    }
}

/// Cloneable front end of a running [`Registry`].
pub struct RegistryHandle<K: RegistryKey, A: Actor> {
    address: Address<Registry<K, A>>,
}

impl<K: RegistryKey, A: Actor> Clone for RegistryHandle<K, A> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
        }
    }
}

impl<K: RegistryKey, A: Actor> fmt::Debug for RegistryHandle<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("address", &self.address)
            .finish()
    }
}

impl<K: RegistryKey, A: Actor> RegistryHandle<K, A> {
    /// Starts a registry whose entries use unbounded mailboxes.
    pub fn spawn() -> Self {
        Self::spawn_with(MailboxConfig::default())
    }

    /// Starts a registry whose entries use `mailbox`.
    pub fn spawn_with(mailbox: MailboxConfig) -> Self {
        let context = Context::new();
        let address = context.address();
        context.start(Registry::new(mailbox));
        Self { address }
    }

    /// Returns the actor for `key`, building it with `factory` if there is none
    /// (or the cached one has terminated).
    pub async fn get_or_create<F>(&self, key: K, factory: F) -> Result<Address<A>, ActorError>
    where
        F: FnOnce(&K, Address<A>) -> A + Send + 'static,
    {
        self.address
            .send(GetOrCreate {
                key,
                factory: Box::new(factory),
            })
            .await
    }

    /// The live actor for `key`, without creating one.
    pub async fn get(&self, key: K) -> Result<Option<Address<A>>, ActorError> {
        self.address.send(Lookup(key)).await
    }

    /// Stops the actor for `key` and forgets it. Returns false if unknown.
    pub async fn remove(&self, key: K) -> Result<bool, ActorError> {
        self.address.send(Remove(key)).await
    }

    /// Number of live entries.
    pub async fn len(&self) -> Result<usize, ActorError> {
        Ok(self.address.send(Stats).await?.0)
    }

    /// Number of actors built since the registry started.
    pub async fn created(&self) -> Result<u64, ActorError> {
        Ok(self.address.send(Stats).await?.1)
    }

    pub fn address(&self) -> Address<Registry<K, A>> {
        self.address.clone()
    }

    /// Stops the registry once queued requests are served, tearing down every entry.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        self.address.stop().await
    }
}
