//! Axum router construction for the chat API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use lifegame_runner::Completion;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the chat API.
///
/// CORS allows any origin so browser-based chat clients can connect.
pub fn build_router<C: Completion + 'static>(state: Arc<AppState<C>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index::<C>))
        .route("/api/messages", post(handlers::post_message::<C>))
        .route("/api/callbacks", post(handlers::post_callback::<C>))
        .route("/api/players/{id}/inbox", get(handlers::get_inbox::<C>))
        .route("/api/top", get(handlers::get_top::<C>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
