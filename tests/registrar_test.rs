use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::Barrier;
use uuid::Uuid;

use rsvp::bus::channel::ChannelBus;
use rsvp::store::memory::InMemoryStore;
use rsvp::{CountUpdate, Registrar, RegistrarError};

async fn registrar_with_bus(
    title: &str,
    max_capacity: i32,
) -> (Uuid, Registrar<InMemoryStore>, Arc<ChannelBus>) {
    let store = InMemoryStore::new();
    let event_id = Uuid::new_v4();
    store.insert_event(event_id, title, max_capacity).await;

    let bus = Arc::new(ChannelBus::new());
    let registrar = Registrar::new(store).add_bus(Arc::clone(&bus));

    (event_id, registrar, bus)
}

#[tokio::test]
async fn fills_an_event_to_capacity_and_frees_a_seat_on_cancel() {
    let (event_id, registrar, _bus) = registrar_with_bus("spring hackathon", 2).await;

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();

    assert_eq!(registrar.register(event_id, a).await.unwrap().current_count, 1);
    assert_eq!(registrar.register(event_id, b).await.unwrap().current_count, 2);

    let full = registrar.register(event_id, c).await;
    assert!(matches!(full, Err(RegistrarError::CapacityExceeded(id)) if id == event_id));
    assert_eq!(registrar.snapshot(event_id).await.unwrap().current_count, 2);

    assert_eq!(registrar.cancel(event_id, a).await.unwrap().current_count, 1);
    assert_eq!(registrar.register(event_id, c).await.unwrap().current_count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_never_exceed_capacity() {
    let max_capacity = 8;
    let attempts = 32;
    let (event_id, registrar, _bus) = registrar_with_bus("career fair", max_capacity).await;

    let registrar = Arc::new(registrar);
    let barrier = Arc::new(Barrier::new(attempts));

    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let registrar = Arc::clone(&registrar);
            let barrier = Arc::clone(&barrier);

            tokio::spawn(async move {
                let jitter = rand::thread_rng().gen_range(0..5u64);
                barrier.wait().await;
                tokio::time::sleep(Duration::from_millis(jitter)).await;
                registrar.register(event_id, Uuid::new_v4()).await
            })
        })
        .collect();

    let mut successes = 0;
    let mut capacity_failures = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(RegistrarError::CapacityExceeded(_)) => capacity_failures += 1,
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }

    assert_eq!(successes, max_capacity);
    assert_eq!(capacity_failures as i32, attempts as i32 - max_capacity);
    assert_eq!(
        registrar.snapshot(event_id).await.unwrap().current_count,
        i64::from(max_capacity)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_duplicate_pair_registers_exactly_once() {
    let (event_id, registrar, _bus) = registrar_with_bus("open mic night", 10).await;

    let registrar = Arc::new(registrar);
    let registrant_id = Uuid::new_v4();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registrar = Arc::clone(&registrar);
            tokio::spawn(async move { registrar.register(event_id, registrant_id).await })
        })
        .collect();

    let mut outcomes = vec![];
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(RegistrarError::AlreadyRegistered { .. }))));
    assert_eq!(registrar.snapshot(event_id).await.unwrap().current_count, 1);
}

#[tokio::test]
async fn cancel_then_register_round_trips_the_count() {
    let (event_id, registrar, _bus) = registrar_with_bus("alumni dinner", 3).await;

    let registrant_id = Uuid::new_v4();
    registrar.register(event_id, Uuid::new_v4()).await.unwrap();
    registrar.register(event_id, registrant_id).await.unwrap();
    let before = registrar.snapshot(event_id).await.unwrap().current_count;

    registrar.cancel(event_id, registrant_id).await.unwrap();
    let after_cancel = registrar.register(event_id, registrant_id).await.unwrap();

    assert_eq!(after_cancel.current_count, before);
}

#[tokio::test]
async fn snapshot_tracks_every_committed_change() {
    let (event_id, registrar, _bus) = registrar_with_bus("robotics demo", 5).await;

    let registrants: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    for registrant_id in &registrants {
        registrar.register(event_id, *registrant_id).await.unwrap();
    }
    registrar.cancel(event_id, registrants[0]).await.unwrap();
    registrar.cancel(event_id, registrants[1]).await.unwrap();

    let snapshot = registrar.snapshot(event_id).await.unwrap();
    assert_eq!(snapshot.current_count, 2);
    assert_eq!(snapshot.max_capacity, 5);
    assert_eq!(snapshot.title, "robotics demo");
}

#[tokio::test]
async fn updates_are_broadcast_only_after_commit() {
    let (event_id, registrar, bus) = registrar_with_bus("film screening", 1).await;
    let mut receiver = bus.subscribe(event_id).await;

    let registrant_id = Uuid::new_v4();
    registrar.register(event_id, registrant_id).await.unwrap();
    assert_eq!(
        receiver.recv().await.unwrap(),
        CountUpdate {
            event_id,
            current_count: 1
        }
    );

    // Each of these aborts its transaction: nothing may reach the topic.
    let _ = registrar.register(event_id, registrant_id).await.unwrap_err();
    let _ = registrar.register(event_id, Uuid::new_v4()).await.unwrap_err();
    let _ = registrar.cancel(event_id, Uuid::new_v4()).await.unwrap_err();
    let _ = registrar.register(Uuid::new_v4(), registrant_id).await.unwrap_err();
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));

    registrar.cancel(event_id, registrant_id).await.unwrap();
    assert_eq!(
        receiver.recv().await.unwrap(),
        CountUpdate {
            event_id,
            current_count: 0
        }
    );
}

#[tokio::test]
async fn late_subscriber_initializes_from_a_snapshot() {
    let (event_id, registrar, bus) = registrar_with_bus("poetry slam", 10).await;

    // Updates published before the subscription existed are gone for good.
    registrar.register(event_id, Uuid::new_v4()).await.unwrap();
    registrar.register(event_id, Uuid::new_v4()).await.unwrap();

    let mut receiver = bus.subscribe(event_id).await;
    let base = registrar.snapshot(event_id).await.unwrap().current_count;
    assert_eq!(base, 2);

    registrar.register(event_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(receiver.recv().await.unwrap().current_count, base + 1);
}

#[tokio::test]
async fn unknown_event_is_reported_as_not_found() {
    let (_, registrar, _bus) = registrar_with_bus("chess tournament", 4).await;
    let missing = Uuid::new_v4();

    assert!(matches!(
        registrar.register(missing, Uuid::new_v4()).await,
        Err(RegistrarError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        registrar.cancel(missing, Uuid::new_v4()).await,
        Err(RegistrarError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        registrar.snapshot(missing).await,
        Err(RegistrarError::NotFound(id)) if id == missing
    ));
}

#[tokio::test]
async fn cancelling_an_absent_registration_fails_cleanly() {
    let (event_id, registrar, _bus) = registrar_with_bus("game jam", 4).await;

    let result = registrar.cancel(event_id, Uuid::new_v4()).await;

    assert!(matches!(result, Err(RegistrarError::RegistrationNotFound { .. })));
    assert_eq!(registrar.snapshot(event_id).await.unwrap().current_count, 0);
}

#[tokio::test]
async fn every_bus_receives_each_committed_update() {
    let store = InMemoryStore::new();
    let event_id = Uuid::new_v4();
    store.insert_event(event_id, "club expo", 5).await;

    let first = Arc::new(ChannelBus::new());
    let second = Arc::new(ChannelBus::new());
    let registrar = Registrar::new(store)
        .add_bus(Arc::clone(&first))
        .add_bus(Arc::clone(&second));

    let mut first_rx = first.subscribe(event_id).await;
    let mut second_rx = second.subscribe(event_id).await;

    let update = registrar.register(event_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(first_rx.recv().await.unwrap(), update);
    assert_eq!(second_rx.recv().await.unwrap(), update);
}

#[test]
fn count_update_wire_shape_is_fixed() {
    let event_id = Uuid::new_v4();
    let update = CountUpdate {
        event_id,
        current_count: 5,
    };

    let json = serde_json::to_value(&update).unwrap();

    assert_eq!(
        json,
        serde_json::json!({ "event_id": event_id.to_string(), "current_count": 5 })
    );
}
