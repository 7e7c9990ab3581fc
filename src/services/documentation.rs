use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Reel Rally Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_snapshot,
        crate::routes::public::get_ranking,
        crate::routes::admin::login,
        crate::routes::admin::logout,
        crate::routes::admin::session,
        crate::routes::sse::spectator_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::admin::LoginRequest,
            crate::dto::admin::LoginResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::SessionStatus,
            crate::dto::snapshot::PlayerRoundView,
            crate::dto::snapshot::SnapshotView,
            crate::dto::snapshot::RankedEntryView,
            crate::dto::snapshot::RankingView,
            crate::dto::sse::Handshake,
            crate::dto::ws::JoinData,
            crate::dto::ws::RoundData,
            crate::dto::ws::StopReelData,
            crate::dto::ws::SnapshotData,
            crate::dto::ws::ModeData,
            crate::dto::ws::StartAllData,
            crate::dto::ws::ResetAllData,
            crate::dto::ws::RebindAllData,
            crate::dto::ws::ClientStatePayload,
            crate::dto::ws::SpinResultPayload,
            crate::dto::ws::ConfettiPayload,
            crate::dto::ws::ForceRebindPayload,
            crate::dto::ws::ErrorPayload,
            crate::state::round::GameMode,
            crate::state::round::RoundPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only game state"),
        (name = "admin", description = "Admin session management"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "players", description = "WebSocket protocol for players and the admin console"),
    )
)]
pub struct ApiDoc;
