//! The gateway's router: `/ws` plus a `/health` liveness probe.
//!
//! CORS is permissive by design — this gateway has no browser-session
//! cookie or credential to protect (spec.md's Non-goals exclude auth), so
//! a configured origin allow-list would add ceremony without adding
//! safety. `TraceLayer` gives every request a structured span the way the
//! teacher instruments its own HTTP surface.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::gateway::{ws_handler, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}
