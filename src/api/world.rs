use crate::state::{Attributes, NotifyError, World, WorldStore};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared state for the world/entity HTTP API
pub struct WorldAppState {
    pub store: Arc<WorldStore>,
    pub max_body_bytes: usize,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create world/entity API router
pub fn create_world_router(state: Arc<WorldAppState>) -> Router {
    Router::new()
        .route("/world", get(get_world).post(get_world))
        .route(
            "/entity/:name",
            get(get_entity).post(update_entity).put(update_entity),
        )
        .route("/clear", get(clear_world).post(clear_world))
        // max_body_bytes is enforced by update_entity
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// GET|POST /world - Full world snapshot
async fn get_world(State(state): State<Arc<WorldAppState>>) -> Json<World> {
    Json(state.store.snapshot())
}

/// GET /entity/:name - One entity's attributes (empty object if unseen)
async fn get_entity(
    State(state): State<Arc<WorldAppState>>,
    Path(name): Path<String>,
) -> Json<Attributes> {
    Json(state.store.get(&name))
}

/// POST|PUT /entity/:name - Merge each key of the body into the entity
///
/// Every key goes through the store's merge path, so connected sockets see
/// one change event per key. Responds with the submitted body.
async fn update_entity(
    State(state): State<Arc<WorldAppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Attributes>, ApiError> {
    if body.len() > state.max_body_bytes {
        return Err(ApiError::PayloadTooLarge);
    }

    let data: Attributes = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;

    // Apply every key even if a broadcast fails part way
    let mut broadcast_failure = None;
    for (key, value) in &data {
        if let Err(e) = state.store.update(&name, key, value.clone()) {
            broadcast_failure.get_or_insert(e);
        }
    }

    if let Some(e) = broadcast_failure {
        return Err(ApiError::Broadcast(e));
    }

    info!(entity = %name, keys = data.len(), "Entity updated");
    Ok(Json(data))
}

/// GET|POST /clear - Empty the world and return the (empty) snapshot
async fn clear_world(State(state): State<Arc<WorldAppState>>) -> Json<World> {
    Json(state.store.clear())
}

/// World API error types
#[derive(Debug)]
enum ApiError {
    InvalidJson,
    PayloadTooLarge,
    Broadcast(NotifyError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidJson => (StatusCode::BAD_REQUEST, "Invalid JSON data".to_string()),
            ApiError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
            }
            ApiError::Broadcast(e) => {
                error!(error = %e, "Entity updated but broadcast failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
