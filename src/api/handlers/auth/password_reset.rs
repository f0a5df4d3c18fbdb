//! Password-reset token lifecycle: request, redeem, expiry sweep.
//!
//! The request step is anti-enumeration: it answers with the same generic
//! `200` whether or not the email maps to an account. The redeem step may
//! reveal invalidity, since the token itself is the secret, not the account.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::api::email::{build_reset_url, EmailMessage};

use super::{
    error::AuthError,
    password::hash_password,
    state::{AuthConfig, AuthState},
    storage::{
        cleanup_expired_reset_tokens, insert_reset_token, lookup_user_by_email,
        redeem_reset_token,
    },
    types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest},
    utils::{extract_client_ip, generate_reset_token},
    validation::{check_password, normalize_email, valid_email},
};

const GENERIC_RESET_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

#[utoipa::path(
    post,
    path = "/api/users/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic success, never reveals account existence", body = MessageResponse),
        (status = 400, description = "Malformed email", body = String)
    ),
    tag = "users"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return AuthError::Validation(vec!["Invalid email address".to_string()]).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    auth_state
        .audit()
        .password_reset_request(&email, client_ip.as_deref());

    let generic_ok = (
        StatusCode::OK,
        Json(MessageResponse {
            message: GENERIC_RESET_MESSAGE.to_string(),
        }),
    )
        .into_response();

    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Reset lookup failed: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    };

    // Unknown email: same response as the happy path.
    let Some(user) = user else {
        return generic_ok;
    };

    let token = match generate_reset_token() {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to generate reset token: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    };

    if let Err(err) = insert_reset_token(&pool, user.user_id, &token).await {
        error!("Failed to persist reset token: {err:#}");
        return AuthError::Internal(err).into_response();
    }

    let reset_url = build_reset_url(auth_state.config().base_url(), &token);
    let message = EmailMessage {
        to_email: email.clone(),
        subject: "Reset your password".to_string(),
        payload_json: json!({
            "email": email,
            "reset_url": reset_url,
        })
        .to_string(),
    };
    // Delivery failures are logged, not surfaced: the response stays generic.
    if let Err(err) = auth_state.email_sender().send(&message) {
        error!("Failed to send reset email: {err:#}");
    }

    generic_ok
}

#[utoipa::path(
    post,
    path = "/api/users/reset-password-token/{token}",
    request_body = ResetPasswordRequest,
    params(
        ("token" = String, Path, description = "Reset token from the email link")
    ),
    responses(
        (status = 200, description = "Password reset, token consumed", body = MessageResponse),
        (status = 400, description = "Missing or weak password", body = String),
        (status = 404, description = "Token invalid or expired", body = String)
    ),
    tag = "users"
)]
pub async fn reset_password(
    headers: HeaderMap,
    Path(token): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response(),
    };

    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response();
    }

    let check = check_password(&request.password);
    if !check.valid {
        return AuthError::Validation(check.reasons).into_response();
    }

    let new_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    };

    match redeem_reset_token(&pool, token.trim(), &new_hash, auth_state.config()).await {
        Ok(Some(user_id)) => {
            let client_ip = extract_client_ip(&headers);
            auth_state
                .audit()
                .password_change(&user_id.to_string(), client_ip.as_deref());
            (
                StatusCode::OK,
                Json(MessageResponse {
                    message: "Password has been reset".to_string(),
                }),
            )
                .into_response()
        }
        // Unknown and expired tokens are indistinguishable on purpose.
        Ok(None) => AuthError::ResetTokenNotFound.into_response(),
        Err(err) => {
            error!("Failed to redeem reset token: {err:#}");
            AuthError::Internal(err).into_response()
        }
    }
}

/// Background sweep deleting reset tokens nobody redeemed within the TTL.
/// Each pass is idempotent, so the schedule is safe to change.
pub(crate) fn spawn_reset_token_sweeper(pool: PgPool, config: AuthConfig, interval: Duration) {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match cleanup_expired_reset_tokens(&pool, &config).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired password reset tokens removed"),
                Err(err) => error!("Reset token sweep failed: {err:#}"),
            }
        }
    });
}
