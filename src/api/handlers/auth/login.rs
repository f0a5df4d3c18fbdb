//! Login and logout endpoints.
//!
//! Login runs its own limiter keyed by username (the gate bypasses
//! `/api/login`). Every failure path — rate limited, unknown user, wrong
//! password — answers with the same generic `401` after a random 100-500ms
//! delay, so neither the body nor the timing reveals which case occurred.

use axum::{
    extract::Extension,
    http::{
        header::{SET_COOKIE, USER_AGENT},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    audit::AuditKind,
    error::AuthError,
    password::verify_password,
    rate_limit::{RateLimitDecision, RateLimitPolicy},
    state::AuthState,
    storage::lookup_user_by_username,
    token::{clear_jwt_cookie, extract_token, jwt_cookie},
    types::{LoginRequest, LoginResponse, MessageResponse},
    utils::{extract_client_ip, failed_login_delay},
    validation::suspicious_pattern,
};

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_AGENT).and_then(|value| value.to_str().ok())
}

/// Extras attached to login audit events. The suspicious-input flag rides on
/// every outcome, success included.
fn audit_extras(
    reason: Option<&'static str>,
    suspicious: bool,
) -> Vec<(&'static str, &'static str)> {
    let mut extra = Vec::new();
    if let Some(reason) = reason {
        extra.push(("reason", reason));
    }
    if suspicious {
        extra.push(("suspicious_input", "true"));
    }
    extra
}

async fn login_rejection(
    auth_state: &AuthState,
    username: &str,
    ip: Option<&str>,
    agent: Option<&str>,
    reason: &'static str,
    suspicious: bool,
) -> Response {
    auth_state.audit().emit(
        AuditKind::LoginFailure,
        username,
        ip,
        agent,
        &audit_extras(Some(reason), suspicious),
    );

    failed_login_delay().await;
    AuthError::InvalidCredentials.into_response()
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, JWT cookie set", body = LoginResponse),
        (status = 400, description = "Missing or malformed payload", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim().to_string();
    if username.is_empty() || request.password.is_empty() {
        return AuthError::Validation(vec![
            "Username and password are required".to_string()
        ])
        .into_response();
    }

    let client_ip = extract_client_ip(&headers);
    let agent = user_agent(&headers);
    let suspicious = suspicious_pattern(&username);

    // Consume-then-reject: an exhausted attacker keeps burning units.
    if auth_state
        .rate_limiter()
        .consume(RateLimitPolicy::Login, &username)
        == RateLimitDecision::Limited
    {
        return login_rejection(
            &auth_state,
            &username,
            client_ip.as_deref(),
            agent,
            "rate_limited",
            suspicious,
        )
        .await;
    }

    let record = match lookup_user_by_username(&pool, &username).await {
        Ok(record) => record,
        Err(err) => {
            error!("Login lookup failed: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    };

    let Some(user) = record.filter(|user| verify_password(&user.password_hash, &request.password))
    else {
        return login_rejection(
            &auth_state,
            &username,
            client_ip.as_deref(),
            agent,
            "invalid_credentials",
            suspicious,
        )
        .await;
    };

    // The credential subject is the username; /api/me echoes it back.
    let issued = match auth_state.issuer().issue(&user.username) {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to issue credential: {err}");
            return AuthError::Internal(err.into()).into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match jwt_cookie(auth_state.config().cookie_secure(), &issued.token) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build auth cookie: {err}");
            return AuthError::Internal(err.into()).into_response();
        }
    }

    auth_state.audit().emit(
        AuditKind::LoginSuccess,
        &user.username,
        client_ip.as_deref(),
        agent,
        &audit_extras(None, suspicious),
    );

    (
        StatusCode::OK,
        response_headers,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            token: issued.token,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "JWT cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let actor = extract_token(&headers)
        .and_then(|token| auth_state.issuer().verify(&token))
        .map_or_else(|| "anonymous".to_string(), |claims| claims.sub);

    let client_ip = extract_client_ip(&headers);
    auth_state
        .audit()
        .logout(&actor, client_ip.as_deref(), user_agent(&headers));

    // Always clear the cookie, even without a valid session.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_jwt_cookie(auth_state.config().cookie_secure()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    (
        StatusCode::OK,
        response_headers,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_extras_flag_suspicious_input_on_any_outcome() {
        assert_eq!(audit_extras(None, true), vec![("suspicious_input", "true")]);
        assert_eq!(
            audit_extras(Some("invalid_credentials"), true),
            vec![
                ("reason", "invalid_credentials"),
                ("suspicious_input", "true")
            ]
        );
        assert_eq!(
            audit_extras(Some("rate_limited"), false),
            vec![("reason", "rate_limited")]
        );
        assert!(audit_extras(None, false).is_empty());
    }
}
