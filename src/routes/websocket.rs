use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};

use crate::{
    services::{admin_service, websocket_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/ws",
    tag = "players",
    params(
        ("x-admin-session" = Option<String>, Header, description = "Admin session id; the `admin_session` cookie is accepted too"),
    ),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a player, admin or viewer WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let admin_session = admin_service::session_from_headers(&headers);
    ws.on_upgrade(move |socket| websocket_service::handle_socket(state, socket, admin_session))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
