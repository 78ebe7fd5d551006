//! # Counter Actor
//!
//! One counter per key, handed out by the hub's counter
//! [`RegistryHandle`](actor_runtime::RegistryHandle).
//!
//! ## Overview
//!
//! The counter is the smallest actor that exercises the whole runtime:
//!
//! - requests ([`GetValue`]) and notifications ([`Increment`], [`IncrementBy`]),
//! - reactive propagation: every change is broadcast as [`CountChanged`] to
//!   the subscribed Recipients and published on the [`EventBridge`],
//! - an optional ticker in its [`OwnedTasks`] that increments the counter
//!   periodically through the counter's own Address.
//!
//! ## Usage
//!
//! ```rust
//! use actor_hub::counter_actor::{Counter, GetValue, Increment};
//! use actor_runtime::{Context, EventBridge};
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Context::new();
//!     let counter = context.address();
//!     context.start(Counter::new("lobby", EventBridge::default()));
//!
//!     counter.notify(Increment).await.unwrap();
//!     assert_eq!(counter.send(GetValue).await.unwrap(), 1);
//! }
//! ```

use crate::model::{HubCommand, HubEvent};
use actor_runtime::{Actor, Context, EventBridge, Handler, Notifiable, OwnedTasks, Recipient, Subscribers};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Broadcast to subscribers after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountChanged {
    pub counter: String,
    pub value: u64,
}

#[derive(Debug)]
pub struct Increment;

#[derive(Debug)]
pub struct IncrementBy(pub u64);

#[derive(Debug)]
pub struct GetValue;

/// Registers a subscriber; answers false if it was already subscribed.
pub struct Subscribe(pub Recipient<CountChanged>);

/// Starts (or restarts) the periodic ticker.
#[derive(Debug)]
pub struct StartTicker(pub Duration);

#[derive(Debug)]
pub struct StopTicker;

pub struct Counter {
    name: String,
    value: u64,
    subscribers: Subscribers<CountChanged>,
    events: EventBridge<HubEvent>,
    ticker: Option<Duration>,
    tasks: OwnedTasks,
}

impl Counter {
    pub fn new(name: impl Into<String>, events: EventBridge<HubEvent>) -> Self {
        Self {
            name: name.into(),
            value: 0,
            subscribers: Subscribers::new(),
            events,
            ticker: None,
            tasks: OwnedTasks::new(),
        }
    }

    /// A counter that increments itself every `period` once started.
    pub fn ticking(name: impl Into<String>, events: EventBridge<HubEvent>, period: Duration) -> Self {
        Self {
            ticker: Some(period),
            ..Self::new(name, events)
        }
    }

    fn spawn_ticker(&mut self, ctx: &Context<Self>, period: Duration) {
        self.tasks.abort_all();
        let me = ctx.address();
        self.tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if me.notify(Increment).await.is_err() {
                    break;
                }
            }
        });
        debug!(counter = %self.name, ?period, "Ticker started");
    }

    async fn add(&mut self, amount: u64) {
        let Some(value) = self.value.checked_add(amount) else {
            warn!(counter = %self.name, value = self.value, amount, "Increment would overflow, ignored");
            return;
        };
        self.value = value;
        let change = CountChanged {
            counter: self.name.clone(),
            value: self.value,
        };
        self.subscribers.broadcast(change).await;
        self.events.publish(HubEvent::CountChanged {
            counter: self.name.clone(),
            value: self.value,
        });
    }
}

#[async_trait]
impl Actor for Counter {
    async fn started(&mut self, ctx: &Context<Self>) {
        info!(counter = %self.name, "Counter ready");
        if let Some(period) = self.ticker {
            self.spawn_ticker(ctx, period);
        }
    }
}

#[async_trait]
impl Notifiable<Increment> for Counter {
    async fn notify(&mut self, _: Increment, _: &Context<Self>) {
        self.add(1).await;
    }
}

#[async_trait]
impl Notifiable<IncrementBy> for Counter {
    async fn notify(&mut self, msg: IncrementBy, _: &Context<Self>) {
        self.add(msg.0).await;
    }
}

#[async_trait]
impl Handler<GetValue> for Counter {
    type Response = u64;

    async fn handle(&mut self, _: GetValue, _: &Context<Self>) -> u64 {
        self.value
    }
}

#[async_trait]
impl Handler<Subscribe> for Counter {
    type Response = bool;

    async fn handle(&mut self, msg: Subscribe, _: &Context<Self>) -> bool {
        self.subscribers.subscribe(msg.0)
    }
}

#[async_trait]
impl Notifiable<StartTicker> for Counter {
    async fn notify(&mut self, msg: StartTicker, ctx: &Context<Self>) {
        self.spawn_ticker(ctx, msg.0);
    }
}

#[async_trait]
impl Notifiable<StopTicker> for Counter {
    async fn notify(&mut self, _: StopTicker, _: &Context<Self>) {
        self.tasks.abort_all();
        debug!(counter = %self.name, "Ticker stopped");
    }
}

#[async_trait]
impl Notifiable<HubCommand> for Counter {
    async fn notify(&mut self, command: HubCommand, _: &Context<Self>) {
        if command == HubCommand::Increment {
            self.add(1).await;
        }
    }
}
