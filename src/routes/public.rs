use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::snapshot::{RankingView, SnapshotView},
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints that expose the current game state.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/ranking", get(get_ranking))
}

#[utoipa::path(
    get,
    path = "/api/snapshot",
    tag = "public",
    responses((status = 200, description = "Mode and connected players", body = SnapshotView))
)]
/// Return the mode and every connected player's round.
pub async fn get_snapshot(State(state): State<SharedState>) -> Json<SnapshotView> {
    Json(public_service::snapshot(&state).await)
}

#[utoipa::path(
    get,
    path = "/api/ranking",
    tag = "public",
    responses((status = 200, description = "Connected players ranked by progress", body = RankingView))
)]
/// Return connected players ranked by accuracy, progress and finish time.
pub async fn get_ranking(State(state): State<SharedState>) -> Json<RankingView> {
    Json(public_service::ranking(&state).await)
}
