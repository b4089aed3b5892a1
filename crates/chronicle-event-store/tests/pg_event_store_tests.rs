//! Integration tests for `PgEventStore`.
//!
//! `#[sqlx::test]` creates a scratch database per test on the server named by
//! `DATABASE_URL` and applies the workspace migrations to it.

use chrono::Utc;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, NewEvent};
use chronicle_event_store::pg_event_store::PgEventStore;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `NewEvent` with sensible defaults.
fn make_new_event(event_type: &str) -> NewEvent {
    let serde_json::Value::Object(event_data) = serde_json::json!({"key": "value"}) else {
        unreachable!()
    };
    let serde_json::Value::Object(metadata) =
        serde_json::json!({"correlation_id": Uuid::new_v4().to_string()})
    else {
        unreachable!()
    };
    NewEvent {
        event_id: Uuid::new_v4(),
        event_type: event_type.to_owned(),
        event_data,
        event_version: 1,
        metadata,
        occurred_at: Utc::now(),
    }
}

fn stream_id() -> String {
    Uuid::new_v4().to_string()
}

// --- get_events ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_events_returns_empty_vec_for_nonexistent_aggregate(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let events = store.get_events("module", &stream_id()).await.unwrap();

    assert!(events.is_empty());
}

// --- save_events + get_events round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_and_load_single_event(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();
    let event = make_new_event("module.installed");

    store
        .save_events("module", &aggregate_id, std::slice::from_ref(&event), 0)
        .await
        .unwrap();

    let loaded = store.get_events("module", &aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);

    let e = &loaded[0];
    assert_eq!(e.event_id, event.event_id);
    assert_eq!(e.aggregate_type, "module");
    assert_eq!(e.aggregate_id, aggregate_id);
    assert_eq!(e.event_type, event.event_type);
    assert_eq!(e.event_data, event.event_data);
    assert_eq!(e.event_version, 1);
    assert_eq!(e.aggregate_version, 1);
    assert_eq!(e.metadata, event.metadata);
    // PostgreSQL TIMESTAMPTZ has microsecond precision.
    assert_eq!(
        e.occurred_at.timestamp_micros(),
        event.occurred_at.timestamp_micros()
    );
}

// --- ordering ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_sequential_saves_produce_gap_free_versions(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();

    store
        .save_events(
            "module",
            &aggregate_id,
            &[make_new_event("a"), make_new_event("b")],
            0,
        )
        .await
        .unwrap();
    store
        .save_events(
            "module",
            &aggregate_id,
            &[make_new_event("c"), make_new_event("d")],
            2,
        )
        .await
        .unwrap();

    let loaded = store.get_events("module", &aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 4);
    for (i, event) in loaded.iter().enumerate() {
        assert_eq!(event.aggregate_version, i64::try_from(i + 1).unwrap());
    }
    assert_eq!(
        store.current_version("module", &aggregate_id).await.unwrap(),
        4
    );
}

// --- stream isolation ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_streams_are_keyed_by_type_and_id(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();

    store
        .save_events("module", &aggregate_id, &[make_new_event("a")], 0)
        .await
        .unwrap();
    store
        .save_events("page", &aggregate_id, &[make_new_event("b")], 0)
        .await
        .unwrap();

    let modules = store.get_events("module", &aggregate_id).await.unwrap();
    let pages = store.get_events("page", &aggregate_id).await.unwrap();

    assert_eq!(modules.len(), 1);
    assert_eq!(pages.len(), 1);
    assert_eq!(modules[0].event_type, "a");
    assert_eq!(pages[0].event_type, "b");
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_expected_version_is_rejected_without_partial_rows(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();
    store
        .save_events(
            "module",
            &aggregate_id,
            &[make_new_event("a"), make_new_event("b")],
            0,
        )
        .await
        .unwrap();

    let result = store
        .save_events(
            "module",
            &aggregate_id,
            &[make_new_event("c"), make_new_event("d")],
            0,
        )
        .await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_type,
            aggregate_id: conflict_id,
            expected,
            actual,
        }) => {
            assert_eq!(aggregate_type, "module");
            assert_eq!(conflict_id, aggregate_id);
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    let loaded = store.get_events("module", &aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_first_write_with_nonzero_expected_version_is_rejected(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();

    let result = store
        .save_events("module", &aggregate_id, &[make_new_event("a")], 3)
        .await;

    assert!(matches!(
        result,
        Err(DomainError::ConcurrencyConflict {
            expected: 3,
            actual: 0,
            ..
        })
    ));
    assert!(
        store
            .get_events("module", &aggregate_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_writers_of_same_stream_serialize(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();
    store
        .save_events("module", &aggregate_id, &[make_new_event("a")], 0)
        .await
        .unwrap();
    let events_a = [make_new_event("b")];
    let events_b = [make_new_event("c")];

    let (a, b) = tokio::join!(
        store.save_events("module", &aggregate_id, &events_a, 1),
        store.save_events("module", &aggregate_id, &events_b, 1),
    );

    assert!(a.is_ok() ^ b.is_ok());
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser,
        Err(DomainError::ConcurrencyConflict {
            expected: 1,
            actual: 2,
            ..
        })
    ));
    assert_eq!(
        store.get_events("module", &aggregate_id).await.unwrap().len(),
        2
    );
}

// --- edge cases ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_empty_events_is_noop(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();

    store
        .save_events("module", &aggregate_id, &[], 0)
        .await
        .unwrap();

    assert!(
        store
            .get_events("module", &aggregate_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        store.current_version("module", &aggregate_id).await.unwrap(),
        0
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_complex_json_event_data_round_trip(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = stream_id();
    let serde_json::Value::Object(complex) = serde_json::json!({
        "nested": {"key": "value", "number": 42},
        "array": [1, "two", null, true, false],
        "null_field": null,
        "empty_object": {},
        "empty_array": []
    }) else {
        unreachable!()
    };
    let mut event = make_new_event("a");
    event.event_data = complex.clone();

    store
        .save_events("module", &aggregate_id, &[event], 0)
        .await
        .unwrap();

    let loaded = store.get_events("module", &aggregate_id).await.unwrap();
    assert_eq!(loaded[0].event_data, complex);
}

// --- cross-stream scans ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_all_events_pages_forward_from_cursor(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let first = make_new_event("a");
    let cursor = first.event_id;
    store
        .save_events("module", &stream_id(), &[first], 0)
        .await
        .unwrap();
    store
        .save_events(
            "page",
            &stream_id(),
            &[make_new_event("b"), make_new_event("c")],
            0,
        )
        .await
        .unwrap();

    let all = store.get_all_events(None, 10).await.unwrap();
    let page = store.get_all_events(Some(cursor), 1).await.unwrap();
    let unknown = store
        .get_all_events(Some(Uuid::new_v4()), 10)
        .await
        .unwrap();

    assert_eq!(
        all.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert!(all.windows(2).all(|w| w[0].position < w[1].position));
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].event_type, "b");
    assert!(unknown.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_events_by_type_respects_limit(pool: PgPool) {
    let store = PgEventStore::new(pool);
    for _ in 0..3 {
        store
            .save_events("module", &stream_id(), &[make_new_event("module.enabled")], 0)
            .await
            .unwrap();
    }
    store
        .save_events("module", &stream_id(), &[make_new_event("module.disabled")], 0)
        .await
        .unwrap();

    let events = store
        .get_events_by_type("module.enabled", 2)
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event_type == "module.enabled"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_event_id_is_rejected_without_partial_rows(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let event = make_new_event("a");
    store
        .save_events("module", &stream_id(), std::slice::from_ref(&event), 0)
        .await
        .unwrap();
    let other_stream = stream_id();

    let result = store
        .save_events("module", &other_stream, &[make_new_event("b"), event], 0)
        .await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert!(
        store
            .get_events("module", &other_stream)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        store.current_version("module", &other_stream).await.unwrap(),
        0
    );
}
