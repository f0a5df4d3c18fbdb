//! Error taxonomy for the security boundary.
//!
//! Admission and validation failures are handled here and mapped to status
//! codes; they never reach business logic. User-facing messages stay generic
//! on auth paths so responses cannot be used to enumerate accounts.

use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Rate limit exceeded; recoverable by waiting.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Malformed input; carries the complete list of violated rules.
    #[error("validation failed")]
    Validation(Vec<String>),

    /// No credential cookie, or an invalid/expired one (treated identically).
    #[error("JWT Token not found")]
    MissingCredential,

    /// Wrong password or unknown user; the two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password-reset token unknown or expired. The token itself is the
    /// secret, so revealing invalidity here is fine.
    #[error("invalid or expired token")]
    ResetTokenNotFound,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, "60")],
                Json(json!({"error": "API rate limit exceeded, try again later"})),
            )
                .into_response(),
            Self::Validation(reasons) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": reasons.join(". "),
                    "reasons": reasons,
                })),
            )
                .into_response(),
            Self::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "JWT Token not found"})),
            )
                .into_response(),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid credentials"})),
            )
                .into_response(),
            Self::ResetTokenNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Invalid or expired token"})),
            )
                .into_response(),
            Self::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({"error": message}))).into_response()
            }
            Self::Internal(err) => {
                // Log internals; never leak them to the client.
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn rate_limited_maps_to_429_with_retry_after() {
        let response = AuthError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER).map(|v| v.to_str().ok()),
            Some(Some("60"))
        );
    }

    #[test]
    fn missing_credential_maps_to_401() {
        let response = AuthError::MissingCredential.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn reset_token_not_found_maps_to_404() {
        let response = AuthError::ResetTokenNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let response =
            AuthError::Validation(vec!["Password must contain a digit".to_string()])
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_500() {
        let response = AuthError::Internal(anyhow::anyhow!("storage unavailable")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
