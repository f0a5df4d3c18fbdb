//! Auth configuration and shared request state.

use std::sync::Arc;

use crate::api::email::EmailSender;

use super::{
    audit::AuditLogger,
    rate_limit::{RateLimitConfig, RateLimiter},
    token::TokenIssuer,
};

const DEFAULT_RESET_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    reset_token_ttl_hours: i64,
    rate_limits: RateLimitConfig,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            reset_token_ttl_hours: DEFAULT_RESET_TOKEN_TTL_HOURS,
            rate_limits: RateLimitConfig::new(),
        }
    }

    #[must_use]
    pub fn with_reset_token_ttl_hours(mut self, hours: i64) -> Self {
        self.reset_token_ttl_hours = hours;
        self
    }

    #[must_use]
    pub fn with_rate_limits(mut self, rate_limits: RateLimitConfig) -> Self {
        self.rate_limits = rate_limits;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn rate_limits(&self) -> RateLimitConfig {
        self.rate_limits
    }

    pub(super) const fn reset_token_ttl_hours(&self) -> i64 {
        self.reset_token_ttl_hours
    }

    /// Cookies are marked `Secure` whenever the public base URL is HTTPS,
    /// which covers every non-local deployment.
    pub(super) fn cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Shared state handed to every auth handler: config, the token issuer, the
/// injected rate-limit store, the audit emitter, and the email collaborator.
#[derive(Clone)]
pub struct AuthState {
    config: AuthConfig,
    issuer: TokenIssuer,
    rate_limiter: Arc<dyn RateLimiter>,
    audit: AuditLogger,
    email_sender: Arc<dyn EmailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        issuer: TokenIssuer,
        rate_limiter: Arc<dyn RateLimiter>,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config,
            issuer,
            rate_limiter,
            audit: AuditLogger,
            email_sender,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    #[must_use]
    pub const fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub(super) fn email_sender(&self) -> &dyn EmailSender {
        self.email_sender.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_secure_follows_base_url_scheme() {
        let dev = AuthConfig::new("http://localhost:5173".to_string());
        assert!(!dev.cookie_secure());

        let prod = AuthConfig::new("https://trips.example.com".to_string());
        assert!(prod.cookie_secure());
    }

    #[test]
    fn reset_ttl_defaults_to_24_hours() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        assert_eq!(config.reset_token_ttl_hours(), 24);

        let config = config.with_reset_token_ttl_hours(48);
        assert_eq!(config.reset_token_ttl_hours(), 48);
    }
}
