//! Authenticated subject endpoint, behind `require_auth`.

use axum::{
    extract::Extension,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::{state::AuthState, token::Claims, types::MeResponse, utils::extract_client_ip};

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Verified credential subject", body = MeResponse),
        (status = 401, description = "JWT Token not found", body = String)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    claims: Extension<Claims>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    auth_state
        .audit()
        .sensitive_data_access(&claims.sub, client_ip.as_deref(), "me");

    Json(MeResponse {
        username: claims.sub.clone(),
        expires_at: claims.exp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::LogEmailSender;
    use crate::api::handlers::auth::{AuthConfig, NoopRateLimiter, TokenIssuer};
    use axum::http::StatusCode;
    use secrecy::SecretString;

    #[tokio::test]
    async fn me_returns_the_credential_subject_as_username() {
        let state = Arc::new(AuthState::new(
            AuthConfig::new("http://localhost:5173".to_string()),
            TokenIssuer::new(&SecretString::from("test-secret")),
            Arc::new(NoopRateLimiter),
            Arc::new(LogEmailSender),
        ));
        let claims = Claims {
            sub: "alice".to_string(),
            iat: 0,
            exp: 3600,
        };

        let response = me(HeaderMap::new(), Extension(state), Extension(claims))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["expires_at"], 3600);
    }
}
