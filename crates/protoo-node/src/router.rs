//! Axum router wiring (HTTP -> WS upgrade).
//!
//! One route: `/v1/ws`, upgraded to a protoo peer session.

use axum::{routing::get, Router};

use crate::{app_state::AppState, session};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ws", get(session::ws_upgrade))
        .with_state(state)
}
