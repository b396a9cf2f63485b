use crate::session::SessionRegistry;
use crate::state::WorldStore;
use crate::subscription::ConnectionHandler;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared application state for WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub store: Arc<WorldStore>,
    pub registry: Arc<SessionRegistry>,
    pub idle_timeout: Option<Duration>,
}

/// GET /subscribe - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsAppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| async move {
        ConnectionHandler::new(Arc::clone(&state.store), Arc::clone(&state.registry))
            .with_idle_timeout(state.idle_timeout)
            .handle(socket)
            .await;
    })
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/subscribe", get(ws_handler))
        .with_state(state)
}
