/// Admin login, logout and session handling.
pub mod admin_service;
/// Fan-out of socket notifications to viewers and spectators.
pub mod broadcast;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only projections of the live game.
pub mod public_service;
/// Player and admin commands against the game session.
pub mod round_service;
/// Server-Sent Events stream for read-only spectators.
pub mod spectator_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
