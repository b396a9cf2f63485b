// HTTP and WebSocket APIs

pub mod websocket;
pub mod world;

pub use websocket::{create_ws_router, ws_handler, WsAppState};
pub use world::{create_world_router, WorldAppState};

use crate::config::ServerConfig;
use crate::session::SessionRegistry;
use crate::state::WorldStore;
use axum::{response::Redirect, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Assemble the full server: world API, socket endpoint, static files and
/// the landing-page redirect.
pub fn create_app(
    store: Arc<WorldStore>,
    registry: Arc<SessionRegistry>,
    config: &ServerConfig,
) -> Router {
    let world_state = Arc::new(WorldAppState {
        store: Arc::clone(&store),
        max_body_bytes: config.max_body_bytes,
    });
    let ws_state = Arc::new(WsAppState {
        store,
        registry,
        idle_timeout: config.idle_timeout(),
    });

    let landing_page = config.landing_page.clone();

    Router::new()
        .route(
            "/",
            get(move || {
                let target = landing_page.clone();
                async move { Redirect::to(&target) }
            }),
        )
        .merge(create_world_router(world_state))
        .merge(create_ws_router(ws_state))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
}
