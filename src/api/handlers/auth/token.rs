//! JWT issue/extract and the auth cookie.
//!
//! The credential is an HS256 JWT with a fixed one-hour validity, delivered
//! in the login response body and as a cookie. Verification treats invalid
//! and expired tokens exactly like absent ones, so protected routes expose a
//! single stable `401` regardless of why authentication failed.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE, USER_AGENT},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error::AuthError, state::AuthState, utils::extract_client_ip};

pub(crate) const JWT_COOKIE_NAME: &str = "JWT";
pub(crate) const TOKEN_TTL_SECONDS: i64 = 3600;

/// Claims carried by the credential. `exp` is always `iat + 3600`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Signs and verifies credentials with the process-wide HS256 secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Mint a signed credential for `subject`, valid for one hour.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECONDS,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            token,
            expires_in: TOKEN_TTL_SECONDS,
        })
    }

    /// Verify signature and expiry. Invalid and expired credentials are
    /// treated identically to absent ones, hence `Option`.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// Locate the credential in the designated cookie.
pub(crate) fn extract_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        let val = val.trim();
        if key.trim() == JWT_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Build the `Set-Cookie` value for a freshly issued credential.
///
/// `HttpOnly` is always set; `Secure` follows the configured base URL scheme
/// and must be on in any non-local deployment.
pub(super) fn jwt_cookie(secure: bool, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{JWT_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={TOKEN_TTL_SECONDS}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_jwt_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{JWT_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Middleware guarding protected routes: resolves the cookie into verified
/// claims, or terminates with the canonical `401` body.
pub(crate) async fn require_auth(
    auth_state: Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = extract_token(request.headers())
        .and_then(|token| auth_state.issuer().verify(&token));

    match claims {
        Some(claims) => {
            // Downstream handlers read the verified subject from extensions.
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        None => {
            let ip = extract_client_ip(request.headers());
            let user_agent = request
                .headers()
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok());
            auth_state.audit().access_denied(
                "anonymous",
                ip.as_deref(),
                user_agent,
                request.uri().path(),
            );
            AuthError::MissingCredential.into_response()
        }
    }
}
