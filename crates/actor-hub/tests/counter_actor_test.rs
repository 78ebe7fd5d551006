use actor_hub::clients::CounterClient;
use actor_hub::counter_actor::{CountChanged, Counter, GetValue, StopTicker};
use actor_runtime::mock::Recorder;
use actor_runtime::{ActorError, Context, EventBridge, ExitReason};
use std::time::Duration;

/// Real Counter actor observed through a Recorder probe.
#[tokio::test]
async fn test_subscribers_see_every_change_in_order() {
    let context = Context::new();
    let counter = CounterClient::new(context.address(), None);
    context.start(Counter::new("lobby", EventBridge::default()));

    let (probe, recorder) = Recorder::<CountChanged>::spawn();
    assert!(counter.subscribe(recorder.recipient()).await.unwrap());
    assert!(!counter.subscribe(recorder.recipient()).await.unwrap());

    counter.increment().await.unwrap();
    counter.increment_by(3).await.unwrap();

    let values: Vec<u64> = probe.wait_for(2).await.into_iter().map(|c| c.value).collect();
    assert_eq!(values, vec![1, 4]);
}

#[tokio::test]
async fn test_closed_subscriber_does_not_block_counter() {
    let context = Context::new();
    let counter = CounterClient::new(context.address(), None);
    context.start(Counter::new("lobby", EventBridge::default()));

    let (_probe, recorder) = Recorder::<CountChanged>::spawn();
    counter.subscribe(recorder.recipient()).await.unwrap();
    recorder.stop().await.unwrap();

    counter.increment().await.unwrap();
    counter.increment().await.unwrap();
    assert_eq!(counter.value().await.unwrap(), 2);
}

#[tokio::test]
async fn test_ticker_stops_with_its_actor() {
    let context = Context::new();
    let address = context.address();
    let running = context.start(Counter::ticking(
        "clock",
        EventBridge::default(),
        Duration::from_millis(5),
    ));

    let (probe, recorder) = Recorder::<CountChanged>::spawn();
    CounterClient::new(address.clone(), None)
        .subscribe(recorder.recipient())
        .await
        .unwrap();
    probe.wait_for(3).await;

    // Stopping drops the actor together with its task set.
    address.stop().await.unwrap();
    assert_eq!(running.await.unwrap().unwrap(), ExitReason::Stopped);

    // Let the recorder drain what was already queued.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let seen = probe.recorded().len();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(probe.recorded().len(), seen);
    assert!(matches!(address.send(GetValue).await, Err(ActorError::Closed)));
}

#[tokio::test]
async fn test_stop_ticker_freezes_value() {
    let context = Context::new();
    let address = context.address();
    context.start(Counter::ticking("clock", EventBridge::default(), Duration::from_millis(5)));

    tokio::time::sleep(Duration::from_millis(30)).await;
    address.notify(StopTicker).await.unwrap();
    let frozen = address.send(GetValue).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(address.send(GetValue).await.unwrap(), frozen);
}

#[tokio::test]
async fn test_value_times_out_behind_a_slow_turn() {
    let context = Context::new();
    let counter = CounterClient::new(context.address(), Some(Duration::from_millis(20)));
    // Not started yet: the request sits in the mailbox.
    let err = counter.value().await.unwrap_err();
    assert!(matches!(err, ActorError::TimedOut));

    context.start(Counter::new("late", EventBridge::default()));
    assert_eq!(counter.value().await.unwrap(), 0);
}

#[tokio::test]
async fn test_overflowing_increment_leaves_counter_alive() {
    let context = Context::new();
    let counter = CounterClient::new(context.address(), None);
    let handle = context.start(Counter::new("saturated", EventBridge::default()));

    let (probe, recorder) = Recorder::<CountChanged>::spawn();
    counter.subscribe(recorder.recipient()).await.unwrap();

    counter.increment_by(u64::MAX).await.unwrap();
    counter.increment_by(1).await.unwrap();
    counter.increment().await.unwrap();
    assert_eq!(counter.value().await.unwrap(), u64::MAX);
    assert!(!handle.is_finished());

    // Only the first change was broadcast.
    let values: Vec<u64> = probe.wait_for(1).await.into_iter().map(|c| c.value).collect();
    assert_eq!(values, vec![u64::MAX]);
}
