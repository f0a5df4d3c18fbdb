//! Request admission gate: per-policy rate limiting ahead of dispatch.
//!
//! Every inbound request is matched to a policy by path prefix and consumes
//! one unit from its counter before any handler runs, whether or not the
//! downstream request succeeds. Over-budget requests terminate with `429`
//! and a `rate_limit_exceeded` audit event; nothing else executes for them.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::{
    error::AuthError,
    rate_limit::{RateLimitDecision, RateLimitPolicy},
    state::AuthState,
    utils::extract_client_ip,
};

/// Map a request path to the policy that admits it.
///
/// `/api/login` is bypassed here: the login flow runs its own limiter keyed
/// by username. Non-`/api` paths (health, docs) are never limited.
pub(super) fn select_policy(path: &str) -> Option<RateLimitPolicy> {
    if path == "/api/login" {
        return None;
    }
    if path == "/api/users/register"
        || path == "/api/users/forgot-password"
        || path.starts_with("/api/users/reset-password-token")
    {
        return Some(RateLimitPolicy::ProtectedApi);
    }
    if path.starts_with("/api") {
        return Some(RateLimitPolicy::Api);
    }
    None
}

pub(crate) async fn rate_limit_gate(
    auth_state: Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(policy) = select_policy(request.uri().path()) else {
        return next.run(request).await;
    };

    // Clients behind misconfigured proxies share one bucket rather than
    // bypassing the limit.
    let identifier =
        extract_client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());

    match auth_state.rate_limiter().consume(policy, &identifier) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited => {
            debug!(
                policy = policy.name(),
                identifier = %identifier,
                "request rejected by rate limit gate"
            );
            auth_state
                .audit()
                .rate_limit_exceeded(&identifier, Some(&identifier), policy.name());
            AuthError::RateLimited.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_endpoint_bypasses_the_gate() {
        assert_eq!(select_policy("/api/login"), None);
    }

    #[test]
    fn abuse_prone_endpoints_use_the_protected_policy() {
        assert_eq!(
            select_policy("/api/users/register"),
            Some(RateLimitPolicy::ProtectedApi)
        );
        assert_eq!(
            select_policy("/api/users/forgot-password"),
            Some(RateLimitPolicy::ProtectedApi)
        );
        assert_eq!(
            select_policy("/api/users/reset-password-token/abc123"),
            Some(RateLimitPolicy::ProtectedApi)
        );
    }

    #[test]
    fn other_api_paths_use_the_general_policy() {
        assert_eq!(select_policy("/api/trips"), Some(RateLimitPolicy::Api));
        assert_eq!(select_policy("/api/me"), Some(RateLimitPolicy::Api));
        assert_eq!(select_policy("/api/logout"), Some(RateLimitPolicy::Api));
        // a path that merely shares the /api/users prefix is general traffic
        assert_eq!(
            select_policy("/api/users/profile"),
            Some(RateLimitPolicy::Api)
        );
    }

    #[test]
    fn non_api_paths_are_not_limited() {
        assert_eq!(select_policy("/"), None);
        assert_eq!(select_policy("/health"), None);
        assert_eq!(select_policy("/swagger-ui"), None);
    }
}
