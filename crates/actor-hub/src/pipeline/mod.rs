//! # Supervised Pipeline
//!
//! A [`Pipeline`] parent supervises two children:
//!
//! | Role | Actor | Policy |
//! |------|-------|--------|
//! | `source` | [`Source`] | configurable, [`RestartPolicy::RestartOnFailureOnly`] by default |
//! | `sink` | [`Sink`] | [`RestartPolicy::RestartOnFailureOnly`] |
//!
//! The sink depends on the source. It holds the source's Address and is
//! registered as a dependent of the source slot, so a restarted source is
//! announced to it with a [`DependencyUpdate`]. A restarted sink is built
//! with whatever source Address is current at that moment.

mod children;

pub use children::{Crash, Pull, Pulled, Read, Sink, Source};

use crate::model::{HubCommand, HubEvent};
use actor_runtime::{
    Actor, ActorError, Address, ChildExited, ChildSlot, Context, DependencyUpdate, EventBridge,
    Handler, MailboxConfig, Notifiable, RestartPolicy, Supervised, Supervisor,
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

pub const SOURCE: &str = "source";
pub const SINK: &str = "sink";

/// Current Address of the `source` child.
#[derive(Debug)]
pub struct SourceAddress;

/// Current Address of the `sink` child.
#[derive(Debug)]
pub struct SinkAddress;

#[derive(Debug)]
pub struct Health;

/// Snapshot answered to [`Health`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineHealth {
    pub source_generation: u64,
    pub sink_generation: u64,
    /// Set once a child failed and could not be restarted.
    pub failure: Option<String>,
}

pub struct Pipeline {
    source_policy: RestartPolicy,
    mailbox: MailboxConfig,
    events: EventBridge<HubEvent>,
    supervisor: Option<Supervisor<Pipeline>>,
    source: Option<ChildSlot<Source>>,
    sink: Option<ChildSlot<Sink>>,
    failure: Option<String>,
}

impl Pipeline {
    pub fn new(events: EventBridge<HubEvent>) -> Self {
        Self {
            source_policy: RestartPolicy::default(),
            mailbox: MailboxConfig::default(),
            events,
            supervisor: None,
            source: None,
            sink: None,
            failure: None,
        }
    }

    pub fn with_source_policy(mut self, policy: RestartPolicy) -> Self {
        self.source_policy = policy;
        self
    }

    /// Mailbox used by both children.
    pub fn with_mailbox(mut self, mailbox: MailboxConfig) -> Self {
        self.mailbox = mailbox;
        self
    }

    fn source_address(&self) -> Address<Source> {
        self.source.as_ref().map(ChildSlot::address).unwrap_or_default()
    }

    fn sink_address(&self) -> Address<Sink> {
        self.sink.as_ref().map(ChildSlot::address).unwrap_or_default()
    }

    /// Makes the current sink a dependent of the source slot.
    fn wire_sink(&mut self) {
        let sink = self.sink_address();
        if let Some(source) = self.source.as_mut() {
            source.add_dependent(sink.recipient::<DependencyUpdate<Source>>());
        }
    }

    fn report(&mut self, role: &'static str, outcome: Result<Supervised, ActorError>) {
        match outcome {
            Ok(Supervised::Restarted { generation }) => {
                self.events.publish(HubEvent::ChildRestarted { role, generation });
            }
            Ok(Supervised::Retired) | Ok(Supervised::Stale) => {}
            Err(e) => {
                error!(role, error = %e, "Pipeline degraded");
                self.failure = Some(e.to_string());
            }
        }
    }
}

#[async_trait]
impl Actor for Pipeline {
    async fn started(&mut self, ctx: &Context<Self>) {
        let mut supervisor = Supervisor::with_mailbox(ctx, self.mailbox);
        let source = supervisor.spawn(SOURCE, self.source_policy, |_| Source::new());
        let upstream = source.address();
        let sink = supervisor.spawn(SINK, RestartPolicy::RestartOnFailureOnly, move |_| {
            Sink::new(upstream)
        });

        self.source = Some(source);
        self.sink = Some(sink);
        self.supervisor = Some(supervisor);
        self.wire_sink();
        info!("Pipeline started");
    }

    async fn stopped(&mut self) {
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.shutdown();
        }
    }
}

#[async_trait]
impl Notifiable<ChildExited> for Pipeline {
    async fn notify(&mut self, exited: ChildExited, _: &Context<Self>) {
        let role = exited.role;
        let Some(supervisor) = self.supervisor.as_mut() else {
            return;
        };

        let outcome = match role {
            SOURCE => match self.source.as_mut() {
                Some(slot) => supervisor.handle_exit(slot, exited, |_| Source::new()).await,
                None => return,
            },
            SINK => {
                let upstream = self.source.as_ref().map(ChildSlot::address).unwrap_or_default();
                let outcome = match self.sink.as_mut() {
                    Some(slot) => {
                        supervisor
                            .handle_exit(slot, exited, move |_| Sink::new(upstream))
                            .await
                    }
                    None => return,
                };
                if matches!(outcome, Ok(Supervised::Restarted { .. })) {
                    self.wire_sink();
                }
                outcome
            }
            other => {
                warn!(role = other, "Exit reported for unknown role");
                return;
            }
        };
        self.report(role, outcome);
    }
}

#[async_trait]
impl Handler<SourceAddress> for Pipeline {
    type Response = Address<Source>;

    async fn handle(&mut self, _: SourceAddress, _: &Context<Self>) -> Address<Source> {
        self.source_address()
    }
}

#[async_trait]
impl Handler<SinkAddress> for Pipeline {
    type Response = Address<Sink>;

    async fn handle(&mut self, _: SinkAddress, _: &Context<Self>) -> Address<Sink> {
        self.sink_address()
    }
}

#[async_trait]
impl Handler<Health> for Pipeline {
    type Response = PipelineHealth;

    async fn handle(&mut self, _: Health, _: &Context<Self>) -> PipelineHealth {
        PipelineHealth {
            source_generation: self.source.as_ref().map_or(0, ChildSlot::generation),
            sink_generation: self.sink.as_ref().map_or(0, ChildSlot::generation),
            failure: self.failure.clone(),
        }
    }
}

#[async_trait]
impl Notifiable<HubCommand> for Pipeline {
    async fn notify(&mut self, command: HubCommand, _: &Context<Self>) {
        if command != HubCommand::Pull {
            return;
        }
        match self.sink_address().call(Pull).await {
            Ok(reading) => debug!(reading, "Pulled on command"),
            Err(e) => warn!(error = %e, "Pull command failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spawn(policy: RestartPolicy) -> (Address<Pipeline>, EventBridge<HubEvent>) {
        let events = EventBridge::default();
        let context = Context::new();
        let address = context.address();
        context.start(Pipeline::new(events.clone()).with_source_policy(policy));
        (address, events)
    }

    async fn wait_for_source_generation(pipeline: &Address<Pipeline>, generation: u64) -> PipelineHealth {
        for _ in 0..200 {
            let health = pipeline.send(Health).await.unwrap();
            if health.source_generation >= generation || health.failure.is_some() {
                return health;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("source never reached generation {generation}");
    }

    #[tokio::test]
    async fn sink_reads_through_restarted_source() {
        let (pipeline, events) = spawn(RestartPolicy::RestartOnFailureOnly);
        let mut listener = events.listen();
        let sink = pipeline.send(SinkAddress).await.unwrap();
        let old_source = pipeline.send(SourceAddress).await.unwrap();

        assert_eq!(sink.call(Pull).await.unwrap(), 1);
        assert_eq!(sink.call(Pull).await.unwrap(), 2);

        old_source.notify(Crash).await.unwrap();
        let health = wait_for_source_generation(&pipeline, 2).await;
        assert_eq!(health.source_generation, 2);
        assert_eq!(health.sink_generation, 1);

        assert_eq!(
            listener.recv().await.unwrap(),
            HubEvent::ChildRestarted {
                role: SOURCE,
                generation: 2
            }
        );
        assert!(matches!(old_source.send(Read).await, Err(ActorError::Closed)));

        // Same sink, fresh source state.
        assert_eq!(sink.call(Pull).await.unwrap(), 1);
        assert_eq!(sink.send(Pulled).await.unwrap(), vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn source_failure_without_restart_degrades_pipeline() {
        let (pipeline, _events) = spawn(RestartPolicy::NoRestart);
        let source = pipeline.send(SourceAddress).await.unwrap();
        source.notify(Crash).await.unwrap();

        let health = wait_for_source_generation(&pipeline, 2).await;
        assert_eq!(health.source_generation, 1);
        let failure = health.failure.unwrap();
        assert!(failure.contains("source"), "{failure}");

        let sink = pipeline.send(SinkAddress).await.unwrap();
        assert!(matches!(sink.call(Pull).await, Err(ActorError::HandlerFailed(_))));
    }

    #[tokio::test]
    async fn pull_command_reaches_sink() {
        let (pipeline, _events) = spawn(RestartPolicy::default());
        let sink = pipeline.send(SinkAddress).await.unwrap();

        pipeline.notify(HubCommand::Pull).await.unwrap();
        pipeline.notify(HubCommand::Pull).await.unwrap();
        // Both pulls completed before the pipeline answers this request.
        pipeline.send(Health).await.unwrap();
        assert_eq!(sink.send(Pulled).await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stopping_the_pipeline_stops_its_children() {
        let (pipeline, _events) = spawn(RestartPolicy::RestartAlways);
        let source = pipeline.send(SourceAddress).await.unwrap();
        let sink = pipeline.send(SinkAddress).await.unwrap();

        pipeline.stop().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !(source.is_closed() && sink.is_closed()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
