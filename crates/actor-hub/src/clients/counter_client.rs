//! # Counter Client
//!
//! Wraps an `Address<Counter>` and applies the configured request deadline.
use crate::counter_actor::{CountChanged, Counter, GetValue, Increment, IncrementBy, Subscribe};
use actor_runtime::{ActorError, Address, Recipient};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone, Debug)]
pub struct CounterClient {
    address: Address<Counter>,
    timeout: Option<Duration>,
}

impl CounterClient {
    pub fn new(address: Address<Counter>, timeout: Option<Duration>) -> Self {
        Self { address, timeout }
    }

    pub fn address(&self) -> &Address<Counter> {
        &self.address
    }

    #[instrument(skip(self))]
    pub async fn increment(&self) -> Result<(), ActorError> {
        debug!("Sending notification");
        self.address.notify(Increment).await
    }

    #[instrument(skip(self))]
    pub async fn increment_by(&self, amount: u64) -> Result<(), ActorError> {
        debug!("Sending notification");
        self.address.notify(IncrementBy(amount)).await
    }

    #[instrument(skip(self))]
    pub async fn value(&self) -> Result<u64, ActorError> {
        debug!("Sending request");
        match self.timeout {
            Some(timeout) => self.address.send_timeout(GetValue, timeout).await,
            None => self.address.send(GetValue).await,
        }
    }

    /// Returns false if `subscriber` was already subscribed.
    #[instrument(skip(self, subscriber))]
    pub async fn subscribe(&self, subscriber: Recipient<CountChanged>) -> Result<bool, ActorError> {
        debug!("Sending request");
        self.address.send(Subscribe(subscriber)).await
    }
}
