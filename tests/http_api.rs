//! HTTP contract of the sync server.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use larder::{router, SyncService};
use larder_core::{
    check_server, CheckpointStore, CollectionStore, HttpTransport, LocalRepository, ManualClock,
    MemoryStore, Payload, Reconciler, RoundStatus, DEFAULT_TIMEOUT,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

type Service = SyncService<Arc<MemoryStore>, Arc<ManualClock>>;

fn service() -> (Arc<Service>, Arc<MemoryStore>) {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let service = SyncService::new(store.clone(), Arc::new(ManualClock::new(5_000)));
    (Arc::new(service), store)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (service, _) = service();
    let response = router(service)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_sync_round_trip_shape() {
    let (service, store) = service();
    let (status, body) = post_json(
        router(service),
        "/sync",
        json!({
            "collection": "products",
            "data": [
                {"id": "p1", "name": "Flour", "updatedAt": 100},
                {"id": "p2", "name": "Salt", "updatedAt": 200, "deleted": true}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["syncTime"], 5_000);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["name"], "Flour");
    assert_eq!(data[1]["deleted"], true);
    assert_eq!(store.read_all("products").len(), 2);
}

#[tokio::test]
async fn test_sync_without_data_field_is_pull() {
    let (service, _) = service();
    let app = router(service);
    post_json(
        app.clone(),
        "/sync",
        json!({"collection": "products", "data": [{"id": "p1", "updatedAt": 100}]}),
    )
    .await;

    let (status, body) = post_json(app, "/sync", json!({"collection": "products"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_data_endpoint_filters_by_last_sync_time() {
    let (service, _) = service();
    let app = router(service);
    post_json(
        app.clone(),
        "/sync",
        json!({
            "collection": "products",
            "data": [
                {"id": "old", "updatedAt": 100},
                {"id": "new", "updatedAt": 300}
            ]
        }),
    )
    .await;

    let (status, body) = post_json(
        app,
        "/data",
        json!({"collection": "products", "lastSyncTime": 200}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], "new");
}

#[tokio::test]
async fn test_invalid_collection_is_bad_request() {
    let (service, _) = service();
    let (status, body) = post_json(
        router(service),
        "/data",
        json!({"collection": "../etc"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_collection");
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let service = SyncService::new(store, Arc::new(ManualClock::new(1)))
        .with_allowed_collections(["products"]);
    let (status, body) = post_json(
        router(Arc::new(service)),
        "/sync",
        json!({"collection": "recipes", "data": []}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_collection");
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let (service, store) = service();
    store.set_fail_writes(true);
    let (status, body) = post_json(
        router(service),
        "/sync",
        json!({"collection": "products", "data": [{"id": "p1", "updatedAt": 1}]}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "storage_write_failed");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (service, store) = service();
    let (status, _) = post_json(
        router(service),
        "/sync",
        json!({"collection": "products", "data": [{"name": "no id"}]}),
    )
    .await;

    assert!(status.is_client_error());
    assert!(store.read_all("products").is_empty());
}

#[tokio::test]
async fn test_http_client_against_bound_server() {
    let (service, store) = service();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router(service)).await.unwrap();
    });

    assert!(check_server(&url).await);

    let dir = TempDir::new().unwrap();
    let local_store = larder_core::FileStore::new(dir.path().join("collections"));
    let local = LocalRepository::new(local_store.clone(), Arc::new(ManualClock::new(100)));
    let transport: HttpTransport = HttpTransport::new(url, DEFAULT_TIMEOUT).unwrap();
    let reconciler = Reconciler::new(transport, local_store, CheckpointStore::new(dir.path()));

    let mut payload = Payload::new();
    payload.insert("name".to_string(), json!("Flour"));
    local.put("products", "p1", payload).unwrap();

    let outcome = reconciler.sync("products").await.unwrap();
    assert_eq!(
        outcome.status,
        RoundStatus::Synced {
            sync_time: 5_000,
            received: 1
        }
    );
    assert_eq!(store.read_all("products")[0].payload["name"], "Flour");
    assert_eq!(reconciler.checkpoints().get("products"), Some(5_000));
}
