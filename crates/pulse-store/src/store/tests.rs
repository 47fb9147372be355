use super::EventStore;
use crate::error::Error;
use crate::event::EventStatus;
use serde_json::json;

async fn test_store() -> EventStore {
    EventStore::in_memory().await.unwrap()
}

#[tokio::test]
async fn test_append_assigns_increasing_ids() {
    let store = test_store().await;
    let first = store.append("user.created", &json!({"n": 1}), "api").await.unwrap();
    let second = store.append("user.created", &json!({"n": 2}), "api").await.unwrap();
    let third = store.append("order.paid", &json!({"n": 3}), "system").await.unwrap();

    assert!(second.id > first.id);
    assert!(third.id > second.id);
}

#[tokio::test]
async fn test_append_populates_record() {
    let store = test_store().await;
    let event = store
        .append("user.created", &json!({"user_id": "123"}), "api")
        .await
        .unwrap();

    assert_eq!(event.event_name, "user.created");
    assert_eq!(event.payload, json!({"user_id": "123"}));
    assert_eq!(event.source, "api");
    assert_eq!(event.status, EventStatus::New);
}

#[tokio::test]
async fn test_append_rejects_empty_name() {
    let store = test_store().await;
    let err = store.append("", &json!({}), "api").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Whitespace-only names are rejected too
    let err = store.append("   ", &json!({}), "api").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_list_returns_insertion_order() {
    let store = test_store().await;
    for n in 0..5 {
        store.append("tick", &json!({"n": n}), "system").await.unwrap();
    }

    let events = store.list(None).await.unwrap();
    assert_eq!(events.len(), 5);
    for pair in events.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }
    assert_eq!(events[0].payload, json!({"n": 0}));
    assert_eq!(events[4].payload, json!({"n": 4}));
}

#[tokio::test]
async fn test_list_filters_by_name() {
    let store = test_store().await;
    store.append("order.paid", &json!({"n": 1}), "api").await.unwrap();
    store.append("order.shipped", &json!({"n": 2}), "api").await.unwrap();
    store.append("order.paid", &json!({"n": 3}), "api").await.unwrap();

    let paid = store.list(Some("order.paid")).await.unwrap();
    assert_eq!(paid.len(), 2);
    assert!(paid.iter().all(|e| e.event_name == "order.paid"));
    assert!(paid[0].id < paid[1].id);

    let missing = store.list(Some("order.cancelled")).await.unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_payload_round_trip() {
    let store = test_store().await;
    let payload = json!({
        "user": {"id": "123", "tags": ["a", "b"]},
        "count": 42,
        "nested": {"deep": {"flag": true}}
    });
    store.append("user.created", &payload, "api").await.unwrap();

    let events = store.list(None).await.unwrap();
    assert_eq!(events[0].payload, payload);
}

#[tokio::test]
async fn test_count() {
    let store = test_store().await;
    assert_eq!(store.count().await.unwrap(), 0);
    store.append("a", &json!({}), "system").await.unwrap();
    store.append("b", &json!({}), "system").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_mark_processed() {
    let store = test_store().await;
    let event = store.append("job.done", &json!({}), "system").await.unwrap();

    assert!(store.mark_processed(event.id).await.unwrap());
    let events = store.list(None).await.unwrap();
    assert_eq!(events[0].status, EventStatus::Processed);

    // Unknown id is not an error
    assert!(!store.mark_processed(9999).await.unwrap());
}

#[tokio::test]
async fn test_list_unprocessed() {
    let store = test_store().await;
    let first = store.append("a", &json!({}), "system").await.unwrap();
    store.append("b", &json!({}), "system").await.unwrap();
    store.mark_processed(first.id).await.unwrap();

    let unprocessed = store.list_unprocessed(10).await.unwrap();
    assert_eq!(unprocessed.len(), 1);
    assert_eq!(unprocessed[0].event_name, "b");
}
