//! # Actor Hub
//!
//! Demonstrates the hub end to end:
//! 1. Starting the [`HubSystem`] on a [`FileStorage`] directory.
//! 2. Counting through a client and through outer-layer commands.
//! 3. Persisting a user's preferences.
//! 4. Crashing the pipeline source and pulling through its replacement.
//!
//! `HUB_DATA_DIR` selects the storage directory (default: a temp dir).

use actor_hub::lifecycle::HubSystem;
use actor_hub::model::{HubCommand, PreferencesUpdate};
use actor_hub::pipeline::{Crash, Health, Pull, SinkAddress, SourceAddress};
use actor_hub::storage::FileStorage;
use actor_runtime::logging::setup_tracing;
use actor_runtime::RuntimeConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = RuntimeConfig::from_env();
    let data_dir = std::env::var_os("HUB_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("actor-hub-data"));
    let storage = FileStorage::new(data_dir);
    info!(data_dir = %storage.root().display(), "Starting hub");

    let system = HubSystem::new(config, Arc::new(storage));

    // Outer layer: log every event the hub publishes.
    let mut events = system.events().listen();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "Event");
        }
    });

    let span = tracing::info_span!("counting");
    async {
        let lobby = system.counter("lobby").await.map_err(|e| e.to_string())?;
        lobby.increment().await.map_err(|e| e.to_string())?;
        lobby.increment_by(4).await.map_err(|e| e.to_string())?;

        let router = system.command_router("lobby").await.map_err(|e| e.to_string())?;
        let (commands, inbox) = mpsc::channel(8);
        let routing = tokio::spawn(router.run(inbox));
        for command in [HubCommand::Increment, HubCommand::Increment, HubCommand::Pull] {
            commands.send(command).await.map_err(|e| e.to_string())?;
        }
        drop(commands);
        let delivered = routing.await.map_err(|e| e.to_string())?;

        let value = lobby.value().await.map_err(|e| e.to_string())?;
        info!(delivered, value, "Counter settled");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("settings");
    async {
        let alice = system.settings("alice").await.map_err(|e| e.to_string())?;
        let update = PreferencesUpdate {
            theme: Some("dark".to_string()),
            language: Some("fr".to_string()),
            ..Default::default()
        };
        let prefs = alice.update(update).await.map_err(|e| e.to_string())?;
        info!(?prefs, "Preferences saved");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("supervision");
    async {
        let pipeline = system.pipeline();
        let source = pipeline.send(SourceAddress).await.map_err(|e| e.to_string())?;
        source.notify(Crash).await.map_err(|e| e.to_string())?;

        // The restart happens in the pipeline's next turns.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let health = pipeline.send(Health).await.map_err(|e| e.to_string())?;
        let sink = pipeline.send(SinkAddress).await.map_err(|e| e.to_string())?;
        let reading = sink.call(Pull).await.map_err(|e| e.to_string())?;
        info!(?health, reading, "Pipeline recovered");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    system.shutdown().await.map_err(|e| e.to_string())?;
    printer.abort();

    info!("Hub stopped");
    Ok(())
}
