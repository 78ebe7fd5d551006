use actor_hub::lifecycle::HubSystem;
use actor_hub::model::{HubCommand, HubEvent, PreferencesUpdate};
use actor_hub::pipeline::{Crash, Health, Pull, Read, SinkAddress, SourceAddress, SOURCE};
use actor_hub::settings_actor::SettingsError;
use actor_runtime::mock::MemoryStorage;
use actor_runtime::{ActorError, RestartPolicy, RuntimeConfig};
use std::time::Duration;
use tokio::sync::mpsc;

fn start(storage: &MemoryStorage) -> HubSystem {
    HubSystem::new(RuntimeConfig::default(), storage.shared())
}

/// Full end-to-end test: concurrent resolution of one key yields one actor.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_resolution_shares_one_counter() {
    let system = start(&MemoryStorage::new());

    let (a, b) = tokio::join!(system.counter("u1"), system.counter("u1"));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.address(), b.address());

    a.increment().await.unwrap();
    b.increment().await.unwrap();
    assert_eq!(a.value().await.unwrap(), 2);
    assert_eq!(system.counters().created().await.unwrap(), 1);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_counters_are_isolated_by_key() {
    let system = start(&MemoryStorage::new());
    let lobby = system.counter("lobby").await.unwrap();
    let kitchen = system.counter("kitchen").await.unwrap();

    lobby.increment_by(5).await.unwrap();
    kitchen.increment().await.unwrap();

    assert_eq!(lobby.value().await.unwrap(), 5);
    assert_eq!(kitchen.value().await.unwrap(), 1);
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_commands_reach_counter_and_pipeline() {
    let system = start(&MemoryStorage::new());
    let mut events = system.events().listen();
    let router = system.command_router("lobby").await.unwrap();

    let (commands, inbox) = mpsc::channel(4);
    let routing = tokio::spawn(router.run(inbox));
    commands.send(HubCommand::Increment).await.unwrap();
    commands.send(HubCommand::Pull).await.unwrap();
    drop(commands);
    assert_eq!(routing.await.unwrap(), 2);

    assert_eq!(
        events.recv().await.unwrap(),
        HubEvent::CountChanged {
            counter: "lobby".into(),
            value: 1
        }
    );

    // The pull is handled in the pipeline's turn; the health request queues behind it.
    system.pipeline().send(Health).await.unwrap();
    let sink = system.pipeline().send(SinkAddress).await.unwrap();
    assert_eq!(sink.send(actor_hub::pipeline::Pulled).await.unwrap(), vec![1]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_source_is_restarted_and_stale_address_closed() {
    let system = HubSystem::with_source_policy(
        RuntimeConfig::default(),
        MemoryStorage::new().shared(),
        RestartPolicy::RestartOnFailureOnly,
    );
    let mut events = system.events().listen();
    let pipeline = system.pipeline();

    let stale = pipeline.send(SourceAddress).await.unwrap();
    assert_eq!(stale.send(Read).await.unwrap(), 1);
    stale.notify(Crash).await.unwrap();

    let restarted = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("restart was never reported")
        .unwrap();
    assert_eq!(
        restarted,
        HubEvent::ChildRestarted {
            role: SOURCE,
            generation: 2
        }
    );

    assert!(matches!(stale.send(Read).await, Err(ActorError::Closed)));
    let fresh = pipeline.send(SourceAddress).await.unwrap();
    assert_ne!(fresh, stale);
    assert_eq!(fresh.send(Read).await.unwrap(), 1);

    let health = pipeline.send(Health).await.unwrap();
    assert_eq!(health.source_generation, 2);
    assert_eq!(health.failure, None);

    // The sink was told about the new source.
    let sink = pipeline.send(SinkAddress).await.unwrap();
    assert_eq!(sink.call(Pull).await.unwrap(), 2);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_storage_failure_keeps_preferences_in_memory() {
    let storage = MemoryStorage::new();
    let system = start(&storage);
    let alice = system.settings("alice").await.unwrap();

    storage.fail_saves(true);
    let update = PreferencesUpdate {
        theme: Some("dark".into()),
        ..Default::default()
    };
    let err = alice.update(update).await.unwrap_err();
    assert!(matches!(err, SettingsError::NotSaved(ActorError::PersistFailed(_))));
    assert_eq!(alice.get().await.unwrap().theme, "dark");

    storage.fail_saves(false);
    let update = PreferencesUpdate {
        notifications_enabled: Some(false),
        ..Default::default()
    };
    let prefs = alice.update(update).await.unwrap();
    assert_eq!(prefs.theme, "dark");
    assert!(!prefs.notifications_enabled);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_preferences_survive_a_restarted_hub() {
    let storage = MemoryStorage::new();

    let first = start(&storage);
    let update = PreferencesUpdate {
        language: Some("fr".into()),
        ..Default::default()
    };
    first.settings("bob").await.unwrap().update(update).await.unwrap();
    first.shutdown().await.unwrap();

    let second = start(&storage);
    let prefs = second.settings("bob").await.unwrap().get().await.unwrap();
    assert_eq!(prefs.language, "fr");
    assert_eq!(prefs.theme, "light");
    second.shutdown().await.unwrap();
}
