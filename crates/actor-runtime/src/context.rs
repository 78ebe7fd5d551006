//! # Context
//!
//! A [`Context`] is the exclusive execution environment of one actor: it owns
//! the mailbox receiver and, once [`Context::run`] is called, the actor itself.
//! Only the run loop ever touches the actor's state, one message at a time, so
//! no handler ever needs a lock.
//!
//! ## Lifecycle
//!
//! 1. `Context::new()` creates an empty mailbox. Nothing runs yet.
//! 2. `context.address()` hands out Addresses, e.g. for the actor's constructor.
//! 3. `context.run(actor)` starts the loop; it is usually spawned.
//!
//! The loop ends when
//!
//! - a handler calls [`Context::stop`] or [`Context::fail`], or a stop queued
//!   through [`Address::stop`](crate::Address::stop) is reached,
//! - the owner cancels the Context's [`CancellationToken`] (supervisor or
//!   registry teardown),
//! - every Address was dropped and the queue is drained.
//!
//! Ending closes the mailbox (every Address clone then reports
//! [`ActorError::Closed`]), runs [`Actor::stopped`], and drops the actor
//! together with every task set it owns.

use crate::actor::Actor;
use crate::address::Address;
use crate::config::MailboxConfig;
use crate::error::{ActorError, ExitReason};
use crate::logging::short_type_name;
use crate::mailbox::{self, MailboxReceiver, MailboxSender, WeakMailboxSender};
use crate::message::Envelope;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Identity source only. No actor or Address is reachable through it.
static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a Context (and of every Address pointing at it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    fn next() -> Self {
        ActorId(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution environment and mailbox of one actor.
///
/// Cloning a Context is cheap and yields another handle to the same mailbox;
/// only the first `run` succeeds, any further one fails with
/// [`ActorError::AlreadyRunning`].
pub struct Context<A: Actor> {
    inner: Arc<ContextInner<A>>,
}

struct ContextInner<A: Actor> {
    id: ActorId,
    /// Keeps the mailbox open until the loop has started.
    sender: Mutex<Option<MailboxSender<A>>>,
    weak: WeakMailboxSender<A>,
    receiver: Mutex<Option<MailboxReceiver<A>>>,
    cancel: CancellationToken,
    exit: Mutex<Option<ExitReason>>,
    /// Fired by `stop`/`fail` so an idle loop wakes up.
    halt: CancellationToken,
}

impl<A: Actor> Clone for Context<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Actor> Default for Context<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Actor> fmt::Debug for Context<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("actor", &short_type_name::<A>())
            .field("id", &self.inner.id)
            .finish()
    }
}

impl<A: Actor> Context<A> {
    /// Creates a Context with an unbounded mailbox.
    pub fn new() -> Self {
        Self::with_config(MailboxConfig::default())
    }

    /// Creates a Context whose mailbox holds at most `capacity` messages.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_config(MailboxConfig::bounded(capacity))
    }

    pub fn with_config(config: MailboxConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Creates a Context torn down when `cancel` fires.
    ///
    /// Supervisors and registries pass a child token of their own, so their
    /// teardown reaches every Context they created.
    pub fn with_cancellation(config: MailboxConfig, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mailbox::channel(config);
        let weak = sender.downgrade();
        Self {
            inner: Arc::new(ContextInner {
                id: ActorId::next(),
                sender: Mutex::new(Some(sender)),
                weak,
                receiver: Mutex::new(Some(receiver)),
                cancel,
                exit: Mutex::new(None),
                halt: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.inner.id
    }

    /// Returns an Address of this Context.
    ///
    /// Once the loop runs, the mailbox stays open only through live Addresses;
    /// if all of them are gone the returned Address is already closed.
    pub fn address(&self) -> Address<A> {
        let sender = lock(&self.inner.sender)
            .clone()
            .or_else(|| self.inner.weak.upgrade());
        Address::new(self.inner.id, sender)
    }

    /// Token whose cancellation tears this Context down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Ends the loop voluntarily.
    ///
    /// Called from a handler, the loop ends once the current turn completes.
    /// Called from any other clone of the Context, an idle loop wakes up and
    /// ends without handling another message.
    pub fn stop(&self) {
        let mut exit = lock(&self.inner.exit);
        if exit.is_none() {
            *exit = Some(ExitReason::Stopped);
        }
        self.inner.halt.cancel();
    }

    /// Ends the loop because the actor's state is no longer sound.
    ///
    /// The run loop resolves to [`ExitReason::Failed`], which a supervisor
    /// evaluates against the child's restart policy.
    pub fn fail(&self, cause: impl Into<String>) {
        let cause = cause.into();
        error!(
            actor = short_type_name::<A>(),
            actor_id = %self.inner.id,
            %cause,
            "Actor state unsound, terminating"
        );
        *lock(&self.inner.exit) = Some(ExitReason::Failed(cause));
        self.inner.halt.cancel();
    }

    /// True once `stop` or `fail` was called or the Context was cancelled.
    pub fn is_stopping(&self) -> bool {
        lock(&self.inner.exit).is_some() || self.inner.cancel.is_cancelled()
    }

    /// Spawns the run loop on the Tokio runtime.
    pub fn start(self, actor: A) -> JoinHandle<Result<ExitReason, ActorError>> {
        tokio::spawn(self.run(actor))
    }

    /// Runs the actor until the Context terminates.
    ///
    /// # Errors
    ///
    /// [`ActorError::AlreadyRunning`] if this Context (or a clone of it) was
    /// already run. The actor is dropped in that case.
    pub async fn run(self, mut actor: A) -> Result<ExitReason, ActorError> {
        let mut receiver = lock(&self.inner.receiver)
            .take()
            .ok_or(ActorError::AlreadyRunning)?;

        let actor_type = short_type_name::<A>();
        let actor_id = self.inner.id;
        let cancel = self.inner.cancel.clone();
        let halt = self.inner.halt.clone();
        info!(actor = actor_type, %actor_id, "Actor started");

        actor.started(&self).await;

        // From here on only Addresses keep the mailbox open.
        drop(lock(&self.inner.sender).take());

        let reason = loop {
            if let Some(reason) = lock(&self.inner.exit).take() {
                break reason;
            }

            let envelope = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ExitReason::Cancelled,
                _ = halt.cancelled() => {
                    break lock(&self.inner.exit).take().unwrap_or(ExitReason::Stopped)
                }
                envelope = receiver.recv() => envelope,
            };

            match envelope {
                None => break ExitReason::MailboxClosed,
                Some(Envelope::Stop) => break ExitReason::Stopped,
                Some(Envelope::Message(proxy)) => {
                    debug!(actor = actor_type, %actor_id, message = proxy.kind(), "Dispatch");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break ExitReason::Cancelled,
                        _ = proxy.dispatch(&mut actor, &self) => {}
                    }
                }
            }
        };

        // Pending requests are dropped with the receiver; their callers see `Closed`.
        receiver.close();
        let dropped = receiver.len();
        drop(receiver);

        actor.stopped().await;
        drop(actor);

        match &reason {
            ExitReason::Failed(cause) => {
                warn!(actor = actor_type, %actor_id, %cause, dropped, "Actor failed")
            }
            _ => info!(actor = actor_type, %actor_id, reason = %reason, dropped, "Shutdown"),
        }
        Ok(reason)
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Handler, Notifiable};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Log {
        seen: Vec<u32>,
    }

    impl Actor for Log {}

    struct Push(u32);
    struct Snapshot;
    struct StopNow;
    struct Corrupt;

    #[async_trait]
    impl Notifiable<Push> for Log {
        async fn notify(&mut self, msg: Push, _: &Context<Self>) {
            self.seen.push(msg.0);
        }
    }

    #[async_trait]
    impl Handler<Snapshot> for Log {
        type Response = Vec<u32>;
        async fn handle(&mut self, _: Snapshot, _: &Context<Self>) -> Vec<u32> {
            self.seen.clone()
        }
    }

    #[async_trait]
    impl Notifiable<StopNow> for Log {
        async fn notify(&mut self, _: StopNow, ctx: &Context<Self>) {
            ctx.stop();
        }
    }

    #[async_trait]
    impl Notifiable<Corrupt> for Log {
        async fn notify(&mut self, _: Corrupt, ctx: &Context<Self>) {
            ctx.fail("log out of order");
        }
    }

    fn log() -> Log {
        Log { seen: Vec::new() }
    }

    #[tokio::test]
    async fn second_run_fails_with_already_running() {
        let context = Context::<Log>::new();
        let twin = context.clone();
        let address = context.address();
        let handle = context.start(log());
        // The first loop is live once it answers.
        assert!(address.send(Snapshot).await.unwrap().is_empty());

        let second = twin.run(log()).await;
        assert!(matches!(second, Err(ActorError::AlreadyRunning)));

        address.stop().await.unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), ExitReason::Stopped);
    }

    #[tokio::test]
    async fn stop_from_handler_ends_loop_after_turn() {
        let context = Context::<Log>::new();
        let address = context.address();
        let handle = context.start(log());

        address.notify(Push(1)).await.unwrap();
        address.notify(StopNow).await.unwrap();

        assert_eq!(handle.await.unwrap().unwrap(), ExitReason::Stopped);
        assert!(matches!(address.notify(Push(2)).await, Err(ActorError::Closed)));
        assert!(address.is_closed());
    }

    #[tokio::test]
    async fn fail_reports_failure_reason() {
        let context = Context::<Log>::new();
        let address = context.address();
        let handle = context.start(log());

        address.notify(Corrupt).await.unwrap();

        let reason = handle.await.unwrap().unwrap();
        assert_eq!(reason, ExitReason::Failed("log out of order".into()));
        assert!(matches!(address.send(Snapshot).await, Err(ActorError::Closed)));
    }

    #[tokio::test]
    async fn dropping_every_address_drains_then_closes() {
        let context = Context::<Log>::new();
        let address = context.address();
        for i in 0..3 {
            address.notify(Push(i)).await.unwrap();
        }
        drop(address);

        let reason = context.run(log()).await.unwrap();
        assert_eq!(reason, ExitReason::MailboxClosed);
    }

    #[tokio::test]
    async fn cancellation_tears_down_context() {
        let parent = CancellationToken::new();
        let context = Context::<Log>::with_cancellation(MailboxConfig::default(), parent.child_token());
        let address = context.address();
        let handle = context.start(log());

        address.notify(Push(7)).await.unwrap();
        assert_eq!(address.send(Snapshot).await.unwrap(), vec![7]);

        parent.cancel();
        let reason = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reason, ExitReason::Cancelled);
        assert!(matches!(address.send(Snapshot).await, Err(ActorError::Closed)));
    }

    #[tokio::test]
    async fn context_ids_are_unique() {
        let a = Context::<Log>::new();
        let b = Context::<Log>::new();
        assert_ne!(a.id(), b.id());
        assert!(b.id().as_u64() > a.id().as_u64());
        assert_eq!(a.address().id(), Some(a.id()));
        assert_eq!(a.id().to_string(), a.id().as_u64().to_string());
    }

    #[tokio::test]
    async fn stop_from_a_clone_wakes_an_idle_loop() {
        let context = Context::<Log>::new();
        let twin = context.clone();
        let address = context.address();
        let handle = context.start(log());
        assert!(address.send(Snapshot).await.unwrap().is_empty());
        assert!(!twin.is_stopping());

        twin.stop();
        assert!(twin.is_stopping());
        let reason = tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("idle loop must end after stop")
            .unwrap()
            .unwrap();
        assert_eq!(reason, ExitReason::Stopped);
        assert!(matches!(address.notify(Push(1)).await, Err(ActorError::Closed)));
    }

    #[tokio::test]
    async fn fail_from_a_clone_wakes_an_idle_loop() {
        let context = Context::<Log>::new();
        let twin = context.clone();
        let address = context.address();
        let handle = context.start(log());
        address.send(Snapshot).await.unwrap();

        twin.fail("checksum mismatch");
        let reason = tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("idle loop must end after fail")
            .unwrap()
            .unwrap();
        assert_eq!(reason, ExitReason::Failed("checksum mismatch".into()));
    }

    #[tokio::test]
    async fn stop_before_run_ends_right_after_started() {
        let context = Context::<Log>::new();
        let address = context.address();
        address.notify(Push(1)).await.unwrap();
        context.stop();

        let reason = context.run(log()).await.unwrap();
        assert_eq!(reason, ExitReason::Stopped);
    }
}
