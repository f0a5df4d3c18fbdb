//! OpenAPI document for the security surface.

use utoipa::OpenApi;

use super::handlers::auth::types::{
    ErrorResponse, ForgotPasswordRequest, LoginRequest, LoginResponse, MeResponse,
    MessageResponse, RegisterRequest, ResetPasswordRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::login::login,
        crate::api::handlers::auth::login::logout,
        crate::api::handlers::auth::me::me,
        crate::api::handlers::auth::user_register::register,
        crate::api::handlers::auth::password_reset::forgot_password,
        crate::api::handlers::auth::password_reset::reset_password,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        RegisterRequest,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        MessageResponse,
        ErrorResponse,
        MeResponse,
    )),
    tags(
        (name = "auth", description = "Login, logout and credential inspection"),
        (name = "users", description = "Registration and password reset lifecycle"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_security_surface() {
        let doc = openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/login"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/users/register"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/users/forgot-password"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/users/reset-password-token/{token}"));
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
    }
}
