use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    dto::admin::{ActionResponse, LoginRequest, LoginResponse, SessionStatus},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Admin login endpoints. Admin commands themselves travel over the WebSocket.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/session", get(session))
}

#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened; `admin_session` cookie set", body = LoginResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Wrong admin token"),
        (status = 503, description = "No admin token configured")
    )
)]
/// Exchange the shared admin secret for a session cookie.
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (body, cookie) = admin_service::login(&state, payload)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

#[utoipa::path(
    post,
    path = "/admin/logout",
    tag = "admin",
    responses((status = 200, description = "Session revoked and cookie cleared", body = ActionResponse))
)]
/// Revoke the caller's admin session.
pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let cookie = admin_service::logout(&state, &headers)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(ActionResponse { ok: true })))
}

#[utoipa::path(
    get,
    path = "/admin/session",
    tag = "admin",
    params(("x-admin-session" = Option<String>, Header, description = "Admin session id when no cookie is sent")),
    responses((status = 200, description = "Whether the caller holds a live admin session", body = SessionStatus))
)]
/// Report the caller's admin session status.
pub async fn session(State(state): State<SharedState>, headers: HeaderMap) -> Json<SessionStatus> {
    Json(admin_service::session_status(&state, &headers))
}
