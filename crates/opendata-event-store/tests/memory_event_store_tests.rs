//! Integration tests for `MemoryEventStore`.

use chrono::{TimeZone, Utc};
use opendata_core::event::DomainEvent;
use opendata_core::store::{DeadLetterRecord, EventStore};
use opendata_event_store::MemoryEventStore;
use opendata_test_support::{FixedClock, StubEvent};
use uuid::Uuid;

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

// --- save + get_by_aggregate_id ---

#[tokio::test]
async fn test_get_by_aggregate_id_returns_empty_for_unknown_aggregate() {
    let store: MemoryEventStore<StubEvent> = MemoryEventStore::new();

    let events = store.get_by_aggregate_id(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn test_get_by_aggregate_id_isolates_aggregates() {
    let clock = clock();
    let store = MemoryEventStore::new();
    let agg_a = Uuid::new_v4();
    let agg_b = Uuid::new_v4();

    store
        .save(&StubEvent::for_aggregate("tick.a", agg_a, &clock))
        .await
        .unwrap();
    store
        .save(&StubEvent::for_aggregate("tick.a", agg_a, &clock))
        .await
        .unwrap();
    store
        .save(&StubEvent::for_aggregate("tick.b", agg_b, &clock))
        .await
        .unwrap();

    let loaded_a = store.get_by_aggregate_id(agg_a).await.unwrap();
    let loaded_b = store.get_by_aggregate_id(agg_b).await.unwrap();

    assert_eq!(loaded_a.len(), 2);
    assert_eq!(loaded_b.len(), 1);
    assert!(loaded_a.iter().all(|event| event.aggregate_id() == agg_a));
    assert_eq!(loaded_b[0].aggregate_id(), agg_b);
}

// --- get_by_kind ---

#[tokio::test]
async fn test_get_by_kind_filters_and_preserves_insertion_order() {
    let clock = clock();
    let store = MemoryEventStore::new();
    let first = StubEvent::new("tick.fast", &clock);
    let second = StubEvent::new("tick.fast", &clock);

    store.save(&first).await.unwrap();
    store.save(&StubEvent::new("tick.slow", &clock)).await.unwrap();
    store.save(&second).await.unwrap();

    let loaded = store.get_by_kind("tick.fast", None).await.unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].event_id(), first.event_id());
    assert_eq!(loaded[1].event_id(), second.event_id());
}

#[tokio::test]
async fn test_get_by_kind_respects_limit() {
    let clock = clock();
    let store = MemoryEventStore::new();
    for _ in 0..5 {
        store.save(&StubEvent::new("tick.fast", &clock)).await.unwrap();
    }

    let loaded = store.get_by_kind("tick.fast", Some(3)).await.unwrap();

    assert_eq!(loaded.len(), 3);
}

#[tokio::test]
async fn test_get_by_kind_unknown_kind_returns_empty() {
    let clock = clock();
    let store = MemoryEventStore::new();
    store.save(&StubEvent::new("tick.fast", &clock)).await.unwrap();

    let loaded = store.get_by_kind("tick.never", None).await.unwrap();

    assert!(loaded.is_empty());
}

// --- dead letters ---

#[tokio::test]
async fn test_save_dead_letter_preserves_record_fields() {
    let clock = clock();
    let store = MemoryEventStore::new();
    let event = StubEvent::new("tick.fast", &clock);

    store
        .save_dead_letter(DeadLetterRecord {
            event: event.clone(),
            error_message: "handler exploded".to_string(),
            timestamp: clock.0,
        })
        .await
        .unwrap();

    let records = store.dead_letters();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event.event_id(), event.event_id());
    assert_eq!(records[0].error_message, "handler exploded");
    assert_eq!(records[0].timestamp, clock.0);
}

// --- counters ---

#[tokio::test]
async fn test_counts_track_saves() {
    let clock = clock();
    let store = MemoryEventStore::new();
    assert_eq!(store.event_count(), 0);
    assert_eq!(store.dead_letter_count(), 0);

    let event = StubEvent::new("tick.fast", &clock);
    store.save(&event).await.unwrap();
    store
        .save_dead_letter(DeadLetterRecord {
            event,
            error_message: "handler exploded".to_string(),
            timestamp: clock.0,
        })
        .await
        .unwrap();

    assert_eq!(store.event_count(), 1);
    assert_eq!(store.dead_letter_count(), 1);
}
