use crate::clients::{CounterClient, SettingsClient};
use crate::counter_actor::Counter;
use crate::model::{HubCommand, HubEvent};
use crate::pipeline::Pipeline;
use crate::settings_actor::SettingsActor;
use actor_runtime::{
    ActorError, Address, CommandRouter, Context, EventBridge, ExitReason, RegistryHandle,
    RestartPolicy, RuntimeConfig, Storage,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// The running hub: registries, pipeline and event bridge.
pub struct HubSystem {
    config: RuntimeConfig,
    storage: Arc<dyn Storage>,
    events: EventBridge<HubEvent>,
    counters: RegistryHandle<String, Counter>,
    settings: RegistryHandle<String, SettingsActor>,
    pipeline: Address<Pipeline>,
    pipeline_handle: JoinHandle<Result<ExitReason, ActorError>>,
}

impl HubSystem {
    /// Starts the hub. Must be called inside a Tokio runtime.
    pub fn new(config: RuntimeConfig, storage: Arc<dyn Storage>) -> Self {
        Self::with_source_policy(config, storage, RestartPolicy::default())
    }

    /// Like [`new`](Self::new), with an explicit policy for the pipeline source.
    pub fn with_source_policy(config: RuntimeConfig, storage: Arc<dyn Storage>, policy: RestartPolicy) -> Self {
        let events = EventBridge::default();

        let context = Context::with_config(config.mailbox);
        let pipeline = context.address();
        let pipeline_handle = context.start(
            Pipeline::new(events.clone())
                .with_source_policy(policy)
                .with_mailbox(config.mailbox),
        );

        info!(mailbox = ?config.mailbox, send_timeout = ?config.send_timeout, "Hub started");
        Self {
            counters: RegistryHandle::spawn_with(config.mailbox),
            settings: RegistryHandle::spawn_with(config.mailbox),
            config,
            storage,
            events,
            pipeline,
            pipeline_handle,
        }
    }

    /// The counter `id`, created on first use.
    #[instrument(skip(self))]
    pub async fn counter(&self, id: &str) -> Result<CounterClient, ActorError> {
        let events = self.events.clone();
        let address = self
            .counters
            .get_or_create(id.to_string(), move |id, _| Counter::new(id.clone(), events))
            .await?;
        Ok(CounterClient::new(address, self.config.send_timeout))
    }

    /// The settings actor of `user`, created (and loaded from storage) on first use.
    #[instrument(skip(self))]
    pub async fn settings(&self, user: &str) -> Result<SettingsClient, ActorError> {
        let storage = self.storage.clone();
        let events = self.events.clone();
        let address = self
            .settings
            .get_or_create(user.to_string(), move |user, _| {
                SettingsActor::new(user.clone(), storage, events)
            })
            .await?;
        Ok(SettingsClient::new(address))
    }

    pub fn counters(&self) -> &RegistryHandle<String, Counter> {
        &self.counters
    }

    pub fn pipeline(&self) -> Address<Pipeline> {
        self.pipeline.clone()
    }

    /// Publisher of everything the hub reports to the outer layer.
    pub fn events(&self) -> EventBridge<HubEvent> {
        self.events.clone()
    }

    /// Routes `increment` to the counter `counter_id` and `pull` to the pipeline.
    pub async fn command_router(&self, counter_id: &str) -> Result<CommandRouter<HubCommand>, ActorError> {
        let counter = self.counter(counter_id).await?;
        Ok(CommandRouter::new()
            .route("increment", counter.address().recipient())
            .route("pull", self.pipeline.recipient()))
    }

    /// Stops the registries and the pipeline once their queued requests are
    /// served, and waits for the pipeline to finish.
    pub async fn shutdown(self) -> Result<(), ActorError> {
        info!("Shutting down hub");
        self.counters.shutdown().await?;
        self.settings.shutdown().await?;
        self.pipeline.stop().await?;

        match self.pipeline_handle.await {
            Ok(Ok(exit)) => info!(%exit, "Hub stopped"),
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Pipeline task did not finish cleanly");
                return Err(ActorError::TaskFailed(e.to_string()));
            }
        }
        Ok(())
    }
}
