//! # Event Bridge
//!
//! Connects the actor system to an outer layer (a UI, a socket, a CLI) in both
//! directions, without that layer ever touching actor state.
//!
//! - **Outbound**: [`EventBridge<E>`] publishes typed events. Publishing never
//!   waits; with no listener attached the event is simply dropped.
//! - **Inbound**: [`CommandRouter<C>`] reads a stream of typed commands and
//!   forwards each one as a notification into the mailbox registered for its
//!   [`Command::kind`]. A command kind without a route is a structural defect
//!   and is raised as [`ActorError::UnhandledMessage`].

use crate::address::Recipient;
use crate::error::ActorError;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

/// Default number of events buffered per slow listener before it lags.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Non-blocking publisher of events of type `E`.
pub struct EventBridge<E> {
    sender: broadcast::Sender<E>,
}

impl<E> Clone for EventBridge<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E> fmt::Debug for EventBridge<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("listeners", &self.sender.receiver_count())
            .finish()
    }
}

impl<E: Clone + Send + 'static> Default for EventBridge<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl<E: Clone + Send + 'static> EventBridge<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `event` to every listener and returns how many there were.
    pub fn publish(&self, event: E) -> usize {
        match self.sender.send(event) {
            Ok(listeners) => listeners,
            Err(_) => {
                debug!("Event dropped, no listener");
                0
            }
        }
    }

    /// Attaches a listener that sees every event published from now on.
    pub fn listen(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    pub fn listeners(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Forwards every published event into `recipient` until the recipient
    /// closes or every bridge handle is gone.
    ///
    /// Meant to be spawned into the recipient's own
    /// [`OwnedTasks`](crate::tasks::OwnedTasks).
    pub fn forward(&self, recipient: Recipient<E>) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut events = self.listen();
        async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if recipient.notify(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// A command arriving from outside the actor system.
pub trait Command: Send + 'static {
    /// Routing key of this command.
    fn kind(&self) -> &'static str;
}

/// Forwards commands into actor mailboxes by kind.
pub struct CommandRouter<C> {
    routes: HashMap<&'static str, Recipient<C>>,
}

impl<C> Default for CommandRouter<C> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for CommandRouter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.routes.keys().collect();
        kinds.sort();
        f.debug_struct("CommandRouter").field("routes", &kinds).finish()
    }
}

impl<C: Command> CommandRouter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends commands of `kind` to `recipient`, replacing any earlier route.
    pub fn route(mut self, kind: &'static str, recipient: Recipient<C>) -> Self {
        self.routes.insert(kind, recipient);
        self
    }

    pub fn has_route(&self, kind: &str) -> bool {
        self.routes.contains_key(kind)
    }

    /// Forwards one command.
    ///
    /// # Errors
    ///
    /// [`ActorError::UnhandledMessage`] if no route exists for its kind,
    /// [`ActorError::Closed`] if the routed actor has terminated.
    pub async fn dispatch(&self, command: C) -> Result<(), ActorError> {
        let kind = command.kind();
        match self.routes.get(kind) {
            Some(recipient) => recipient.notify(command).await,
            None => {
                error!(kind, "No route for command");
                Err(ActorError::UnhandledMessage(kind.to_string()))
            }
        }
    }

    /// Drains `commands` until the outer layer closes the stream.
    ///
    /// A failed command is logged and does not stop the stream. Returns the
    /// number of commands delivered.
    pub async fn run(self, mut commands: mpsc::Receiver<C>) -> usize {
        let mut delivered = 0;
        while let Some(command) = commands.recv().await {
            let kind = command.kind();
            match self.dispatch(command).await {
                Ok(()) => delivered += 1,
                Err(ActorError::UnhandledMessage(_)) => {}
                Err(e) => warn!(kind, error = %e, "Command not delivered"),
            }
        }
        debug!(delivered, "Command stream ended");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::Recorder;

    #[derive(Clone, Debug, PartialEq)]
    enum UiCommand {
        Increment,
        Rename(String),
        Quit,
    }

    impl Command for UiCommand {
        fn kind(&self) -> &'static str {
            match self {
                UiCommand::Increment => "increment",
                UiCommand::Rename(_) => "rename",
                UiCommand::Quit => "quit",
            }
        }
    }

    #[tokio::test]
    async fn publish_without_listener_is_dropped() {
        let bridge = EventBridge::<u32>::new(4);
        assert_eq!(bridge.listeners(), 0);
        assert_eq!(bridge.publish(1), 0);

        let mut listener = bridge.listen();
        assert_eq!(bridge.listeners(), 1);
        assert_eq!(bridge.publish(2), 1);
        assert_eq!(listener.recv().await.unwrap(), 2);

        drop(listener);
        assert_eq!(bridge.listeners(), 0);
    }

    #[tokio::test]
    async fn forward_feeds_an_actor() {
        let bridge = EventBridge::<u32>::default();
        let (probe, address) = Recorder::<u32>::spawn();
        let forwarding = tokio::spawn(bridge.forward(address.recipient()));

        bridge.publish(1);
        bridge.publish(2);
        assert_eq!(probe.wait_for(2).await, vec![1, 2]);

        drop(bridge);
        forwarding.await.unwrap();
    }

    #[tokio::test]
    async fn router_forwards_by_kind() {
        let (counter, counter_addr) = Recorder::<UiCommand>::spawn();
        let (names, names_addr) = Recorder::<UiCommand>::spawn();
        let router = CommandRouter::new()
            .route("increment", counter_addr.recipient())
            .route("rename", names_addr.recipient());
        assert!(router.has_route("increment"));
        assert!(!router.has_route("quit"));

        router.dispatch(UiCommand::Increment).await.unwrap();
        router.dispatch(UiCommand::Rename("n".into())).await.unwrap();

        assert_eq!(counter.wait_for(1).await, vec![UiCommand::Increment]);
        assert_eq!(names.wait_for(1).await, vec![UiCommand::Rename("n".into())]);
    }

    #[tokio::test]
    async fn unrouted_kind_is_raised() {
        let router = CommandRouter::<UiCommand>::new();
        let err = router.dispatch(UiCommand::Quit).await.unwrap_err();
        assert!(matches!(&err, ActorError::UnhandledMessage(kind) if kind == "quit"));
        assert!(err.is_structural());
    }

    #[tokio::test]
    async fn run_continues_past_bad_commands() {
        let (probe, address) = Recorder::<UiCommand>::spawn();
        let router = CommandRouter::new().route("increment", address.recipient());
        let (tx, rx) = mpsc::channel(8);

        tx.send(UiCommand::Increment).await.unwrap();
        tx.send(UiCommand::Quit).await.unwrap();
        tx.send(UiCommand::Increment).await.unwrap();
        drop(tx);

        assert_eq!(router.run(rx).await, 2);
        assert_eq!(probe.wait_for(2).await.len(), 2);
    }
}
