use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::{reels::OutOfRange, state_machine::RoundError};

/// Rejections produced while handling a command. None of them is fatal to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The command needs a joined player but the connection has none.
    #[error("not joined: {0}")]
    NotJoined(String),
    /// The round phase does not allow the command.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A reel was stopped out of left-to-right order.
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The command requires the other global mode.
    #[error("mode mismatch: {0}")]
    ModeMismatch(String),
    /// Admin command without a valid admin session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Admin targeted a player that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Admin login is not possible because no admin token is configured.
    #[error("admin token is not configured")]
    NotConfigured,
}

impl ServiceError {
    /// Stable machine-readable code sent in acknowledgements and error notices.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotJoined(_) => "NOT_JOINED",
            ServiceError::InvalidState(_) => "INVALID_STATE",
            ServiceError::InvalidOrder(_) => "INVALID_ORDER",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            ServiceError::ModeMismatch(_) => "MODE_MISMATCH",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::NotConfigured => "NOT_CONFIGURED",
        }
    }

    /// Rejection for commands that need a joined player.
    pub fn not_joined() -> Self {
        ServiceError::NotJoined("join with a name first".into())
    }
}

impl From<RoundError> for ServiceError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::OutOfOrder { .. } => ServiceError::InvalidOrder(err.to_string()),
            RoundError::OutOfRange(range) => ServiceError::from(range),
            RoundError::AlreadySpinning
            | RoundError::Locked
            | RoundError::NotSpinning
            | RoundError::ResetWhileSpinning => ServiceError::InvalidState(err.to_string()),
        }
    }
}

impl From<OutOfRange> for ServiceError {
    fn from(err: OutOfRange) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or not configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotJoined(message)
            | ServiceError::InvalidState(message)
            | ServiceError::InvalidOrder(message)
            | ServiceError::ModeMismatch(message) => AppError::Conflict(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::NotConfigured => {
                AppError::ServiceUnavailable("admin token is not configured".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            ok: false,
            error: self.to_string(),
        });

        (status, payload).into_response()
    }
}
