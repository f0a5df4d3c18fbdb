//! User registration endpoint.

use axum::{
    extract::Extension,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    audit::AuditKind,
    error::AuthError,
    password::hash_password,
    state::AuthState,
    storage::{insert_user, SignupOutcome},
    types::{MessageResponse, RegisterRequest},
    utils::extract_client_ip,
    validation::{check_password, normalize_email, sanitize_text, suspicious_pattern, valid_email, valid_length},
};

#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = MessageResponse),
        (status = 400, description = "Validation failed, all violated rules listed", body = String),
        (status = 409, description = "Username or email already exists", body = String)
    ),
    tag = "users"
)]
pub async fn register(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = sanitize_text(&request.username);
    let email = normalize_email(&request.email);

    // All violations are collected so the client can render one combined message.
    let mut reasons = Vec::new();
    if !valid_length(&username, 3, 50) {
        reasons.push("Username must be between 3 and 50 characters".to_string());
    }
    if !valid_email(&email) {
        reasons.push("Invalid email address".to_string());
    }
    reasons.extend(check_password(&request.password).reasons);

    if !reasons.is_empty() {
        return AuthError::Validation(reasons).into_response();
    }

    // Advisory signal only; the ORM-style bind parameters below remain the
    // real injection defense. Obviously hostile input is rejected and flagged.
    if suspicious_pattern(&username) || suspicious_pattern(&email) {
        let client_ip = extract_client_ip(&headers);
        let agent = headers.get(USER_AGENT).and_then(|value| value.to_str().ok());
        auth_state.audit().emit(
            AuditKind::AccessDenied,
            &username,
            client_ip.as_deref(),
            agent,
            &[("reason", "suspicious_input")],
        );
        return AuthError::Validation(vec!["Invalid input".to_string()]).into_response();
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    };

    match insert_user(&pool, &username, &email, &password_hash).await {
        Ok(SignupOutcome::Created(_user_id)) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Registration successful".to_string(),
            }),
        )
            .into_response(),
        Ok(SignupOutcome::Conflict) => {
            AuthError::Conflict("Username or email already exists".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to register user: {err:#}");
            AuthError::Internal(err).into_response()
        }
    }
}
