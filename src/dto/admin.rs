//! DTO definitions used by the admin login endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_not_blank;

/// Credentials presented to open an admin session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(
        length(max = 256, message = "token is too long"),
        custom(function = validate_not_blank)
    )]
    pub token: String,
}

/// Issued once the admin secret has been accepted. The session id itself travels in the cookie.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub ok: bool,
    /// Session lifetime in milliseconds; extended by every admin action.
    pub expires_in_ms: u64,
}

/// Returned by logout.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub ok: bool,
}

/// Whether the caller currently holds an admin session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub token_configured: bool,
}
