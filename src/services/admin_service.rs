//! Admin session handling behind the login endpoints and the socket handshake.

use axum::http::{HeaderMap, HeaderValue, header};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::admin::{LoginRequest, LoginResponse, SessionStatus},
    error::ServiceError,
    state::SharedState,
};

/// Cookie carrying the admin session id.
pub const SESSION_COOKIE: &str = "admin_session";
/// Header alternative to the cookie, for non-browser clients.
pub const SESSION_HEADER: &str = "x-admin-session";

/// Exchange the admin secret for a session; returns the response body and the cookie to set.
pub fn login(
    state: &SharedState,
    request: LoginRequest,
) -> Result<(LoginResponse, HeaderValue), ServiceError> {
    request.validate()?;
    let sessions = state.admin_sessions();
    let session_id = sessions.login(&request.token).inspect_err(|err| {
        warn!(code = err.code(), "admin login rejected");
    })?;
    info!("admin logged in");

    let ttl = sessions.ttl();
    let cookie = session_cookie(&session_id, ttl.as_secs(), state.config().secure_cookies())?;
    Ok((
        LoginResponse {
            ok: true,
            expires_in_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        },
        cookie,
    ))
}

/// End the caller's session, if any; returns the cookie that clears it client side.
pub fn logout(state: &SharedState, headers: &HeaderMap) -> Result<HeaderValue, ServiceError> {
    if let Some(session_id) = session_from_headers(headers) {
        state.admin_sessions().revoke(&session_id);
        info!("admin logged out");
    }
    session_cookie("", 0, state.config().secure_cookies())
}

/// Report whether the caller holds a live session, extending it when it does.
pub fn session_status(state: &SharedState, headers: &HeaderMap) -> SessionStatus {
    let sessions = state.admin_sessions();
    let authenticated = session_from_headers(headers)
        .map(|session_id| sessions.touch(&session_id))
        .unwrap_or(false);
    SessionStatus {
        authenticated,
        token_configured: sessions.is_configured(),
    }
}

/// Session id presented through the `x-admin-session` header or the `admin_session` cookie.
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(value) = from_header {
        return Some(value.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Drop expired admin sessions; run periodically from `main`.
pub fn sweep_sessions(state: &SharedState) {
    let removed = state.admin_sessions().sweep_expired();
    if removed > 0 {
        info!(removed, "swept expired admin sessions");
    }
}

fn session_cookie(
    session_id: &str,
    max_age_secs: u64,
    secure: bool,
) -> Result<HeaderValue, ServiceError> {
    let mut cookie = format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid session cookie: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[test]
    fn session_is_read_from_header_or_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_from_headers(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=abc123"),
        );
        assert_eq!(session_from_headers(&headers).as_deref(), Some("abc123"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("fromheader"));
        assert_eq!(session_from_headers(&headers).as_deref(), Some("fromheader"));
    }

    #[test]
    fn login_sets_http_only_cookie() {
        let state = AppState::new(AppConfig::default().with_admin_token("s3cret"));
        let (body, cookie) = login(
            &state,
            LoginRequest {
                token: "s3cret".into(),
            },
        )
        .unwrap();
        assert!(body.ok);

        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("admin_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        assert!(session_status(&state, &headers).authenticated);

        let cleared = logout(&state, &headers).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
        assert!(!session_status(&state, &headers).authenticated);
    }

    #[test]
    fn login_without_configured_token() {
        let state = AppState::new(AppConfig::default());
        let err = login(
            &state,
            LoginRequest {
                token: "anything".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err, ServiceError::NotConfigured);
        assert!(!session_status(&state, &HeaderMap::new()).token_configured);
    }
}
