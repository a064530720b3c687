use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dao::models::EventId,
    error::AppError,
    services::{broadcast, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/events/{event_id}",
    tag = "realtime",
    params(("event_id" = u32, Path, description = "Event to follow")),
    responses(
        (status = 200, description = "Event stream, opened with a full resync", content_type = "text/event-stream", body = String),
        (status = 404, description = "Event does not exist")
    )
)]
/// Stream the realtime updates of one event.
pub async fn event_stream(
    State(state): State<SharedState>,
    Path(event_id): Path<EventId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (receiver, initial) = broadcast::subscribe(&state, event_id).await?;
    info!(event_id, "new SSE connection");
    Ok(sse_service::to_sse_stream(event_id, initial, receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/events/{event_id}", get(event_stream))
}
