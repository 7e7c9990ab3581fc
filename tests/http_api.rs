use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use reel_rally_back::{
    config::AppConfig,
    routes,
    state::{
        AppState, SharedState,
        binder::ConnectionId,
        round::GameMode,
    },
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(config: AppConfig) -> (Router, SharedState) {
    let state = AppState::new(config);
    (routes::router(state.clone()), state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(token: &str) -> Request<Body> {
    Request::post("/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "token": token }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let (app, _) = app(AppConfig::default());
    let response = app
        .oneshot(Request::get("/healthcheck").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn snapshot_lists_connected_players() {
    let (app, state) = app(AppConfig::default());
    let connection = ConnectionId::new();
    {
        let mut game = state.game().lock().await;
        game.join(connection, "Ann", None);
        game.set_mode(GameMode::Official);
    }

    let response = app
        .oneshot(Request::get("/api/snapshot").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["mode"], "official");
    let player = &body["clients"][connection.to_string()];
    assert_eq!(player["name"], "Ann");
    assert_eq!(player["phase"], "ready");
    assert_eq!(player["finalReels"], Value::Null);
}

#[tokio::test]
async fn ranking_puts_closest_player_first() {
    let (app, state) = app(AppConfig::default());
    let (leader, trailer) = (ConnectionId::new(), ConnectionId::new());
    {
        let mut game = state.game().lock().await;
        game.join(trailer, "Trailer", None);
        game.join(leader, "Leader", None);
        game.start_spin(leader).unwrap();
        game.stop_reel(leader, 1, 0).unwrap();
    }

    let response = app
        .oneshot(Request::get("/api/ranking").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], leader.to_string());
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["accuracy"], 25);
    assert_eq!(entries[1]["state"]["name"], "Trailer");
}

#[tokio::test]
async fn login_is_unavailable_without_token() {
    let (app, _) = app(AppConfig::default());
    let response = app.oneshot(login_request("anything")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["ok"], false);
}

#[tokio::test]
async fn wrong_or_blank_token_is_rejected() {
    let (app, _) = app(AppConfig::default().with_admin_token("s3cret"));

    let response = app.clone().oneshot(login_request("nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = app.oneshot(login_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_cookie_opens_and_logout_closes_session() {
    let (app, _) = app(AppConfig::default().with_admin_token("s3cret"));

    let response = app.clone().oneshot(login_request("s3cret")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert_eq!(json_body(response).await["ok"], true);

    let session = |cookie: &str| {
        Request::get("/admin/session")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let body = json_body(app.clone().oneshot(session(&cookie)).await.unwrap()).await;
    assert_eq!(
        body,
        json!({ "authenticated": true, "tokenConfigured": true })
    );

    let response = app
        .clone()
        .oneshot(
            Request::post("/admin/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(app.oneshot(session(&cookie)).await.unwrap()).await;
    assert_eq!(body["authenticated"], false);
}
