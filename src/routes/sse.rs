use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::spectator_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/spectator",
    tag = "sse",
    responses((status = 200, description = "Every broadcast notification, read-only", content_type = "text/event-stream", body = String))
)]
/// Stream broadcast notifications to read-only viewers such as a projector screen.
pub async fn spectator_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, greeting) = spectator_service::subscribe(&state).await;
    info!(
        spectators = state.spectators().subscriber_count(),
        "new spectator SSE connection"
    );
    spectator_service::to_sse_stream(receiver, greeting)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/spectator", get(spectator_stream))
}
