//! # Waypost (Trip Planning API — Security Core)
//!
//! `waypost` is the admission-control and credential-lifecycle core of the
//! trip planning API. It fronts every inbound request with a rate-limit gate,
//! validates credentials, mints and extracts the JWT auth cookie, manages the
//! password-reset token lifecycle, and emits a structured audit event for
//! every security-relevant decision.
//!
//! ## Request admission
//!
//! Each `/api` request is checked against a named rate-limit policy before it
//! reaches any handler. Policies are fixed windows keyed by `(policy,
//! identifier)`: client IP for API traffic, username for login attempts.
//! Rejected requests terminate with `429` and never touch business logic.
//!
//! ## Credential lifecycle
//!
//! - **Login** issues an HS256 JWT valid for one hour, delivered in the
//!   response body and as an `HttpOnly` cookie named `JWT`.
//! - **Password reset** uses single-use 64-hex-char tokens valid for 24 hours;
//!   redemption is delete-or-fail inside one transaction, so the first
//!   redeemer wins and a concurrent second redeemer observes "not found".
//! - Responses never reveal whether an email or username exists
//!   (anti-enumeration): reset requests always return a generic success, and
//!   login failures are indistinguishable from unknown users.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
