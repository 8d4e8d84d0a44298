//! HTTP surface of the sync server.
//!
//! - `GET /health`: health check
//! - `POST /sync`: push-and-pull (`SyncDataRequest` -> `SyncResponse`)
//! - `POST /data`: pull-only (`GetDataRequest` -> `SyncResponse`)

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use larder_core::sync::{ErrorBody, HealthResponse};
use larder_core::{Clock, CollectionStore, GetDataRequest, SyncDataRequest, SyncResponse};
use tower_http::trace::TraceLayer;

use super::service::{ServiceError, SyncService};

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn sync_data<S, C>(
    State(service): State<Arc<SyncService<S, C>>>,
    Json(request): Json<SyncDataRequest>,
) -> Result<Json<SyncResponse>, ServiceError>
where
    S: CollectionStore + 'static,
    C: Clock + 'static,
{
    service.sync_data(request).await.map(Json)
}

async fn get_data<S, C>(
    State(service): State<Arc<SyncService<S, C>>>,
    Json(request): Json<GetDataRequest>,
) -> Result<Json<SyncResponse>, ServiceError>
where
    S: CollectionStore + 'static,
    C: Clock + 'static,
{
    service.get_data(request).await.map(Json)
}

/// Builds the router for a sync service.
pub fn router<S, C>(service: Arc<SyncService<S, C>>) -> Router
where
    S: CollectionStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/sync", post(sync_data::<S, C>))
        .route("/data", post(get_data::<S, C>))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}
