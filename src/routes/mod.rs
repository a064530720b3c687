use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod docs;
pub mod health;
pub mod host;
pub mod player;
pub mod sse;
pub mod websocket;

/// Compose the health, realtime, player, host, admin and documentation trees.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(player::router())
        .merge(host::router(state.clone()))
        .merge(admin::router(state.clone()))
        .merge(docs::router());

    api_router.with_state(state)
}
