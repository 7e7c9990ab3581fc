use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload, logging how busy the server is.
pub fn health_status(state: &SharedState) -> HealthResponse {
    debug!(
        sockets = state.connections().len(),
        spectators = state.spectators().subscriber_count(),
        "health check"
    );
    HealthResponse::ok()
}
