//! Structured audit events for every security-relevant decision.
//!
//! Emission is fire-and-forget on the dedicated `audit` tracing target: one
//! synchronous record per call, carrying the event kind, actor, client IP,
//! user agent, and free-form extras. `tracing` emission is infallible, so a
//! failing sink can never abort the request path.

use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditKind {
    LoginSuccess,
    LoginFailure,
    Logout,
    PasswordResetRequest,
    PasswordChange,
    AccessDenied,
    SensitiveDataAccess,
    RateLimitExceeded,
}

impl AuditKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::Logout => "logout",
            Self::PasswordResetRequest => "password_reset_request",
            Self::PasswordChange => "password_change",
            Self::AccessDenied => "access_denied",
            Self::SensitiveDataAccess => "sensitive_data_access",
            Self::RateLimitExceeded => "rate_limit_exceeded",
        }
    }
}

/// Audit event emitter. Append-only from this subsystem's point of view; the
/// sink (log pipeline) is external and never read back.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn emit(
        &self,
        kind: AuditKind,
        actor: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
        extra: &[(&str, &str)],
    ) {
        let extra_json = serde_json::Map::from_iter(
            extra
                .iter()
                .map(|(key, value)| ((*key).to_string(), serde_json::json!(value))),
        );
        let extra = serde_json::to_string(&extra_json).unwrap_or_default();

        info!(
            target: "audit",
            event = kind.as_str(),
            actor = %actor,
            ip = ip.unwrap_or("unknown"),
            user_agent = user_agent.unwrap_or(""),
            extra = %extra,
            "security event"
        );
    }

    pub fn login_success(&self, actor: &str, ip: Option<&str>, user_agent: Option<&str>) {
        self.emit(AuditKind::LoginSuccess, actor, ip, user_agent, &[]);
    }

    pub fn login_failure(
        &self,
        actor: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
        reason: &str,
    ) {
        self.emit(
            AuditKind::LoginFailure,
            actor,
            ip,
            user_agent,
            &[("reason", reason)],
        );
    }

    pub fn logout(&self, actor: &str, ip: Option<&str>, user_agent: Option<&str>) {
        self.emit(AuditKind::Logout, actor, ip, user_agent, &[]);
    }

    pub fn password_reset_request(&self, actor: &str, ip: Option<&str>) {
        self.emit(AuditKind::PasswordResetRequest, actor, ip, None, &[]);
    }

    pub fn password_change(&self, actor: &str, ip: Option<&str>) {
        self.emit(AuditKind::PasswordChange, actor, ip, None, &[]);
    }

    pub fn access_denied(&self, actor: &str, ip: Option<&str>, user_agent: Option<&str>, path: &str) {
        self.emit(
            AuditKind::AccessDenied,
            actor,
            ip,
            user_agent,
            &[("path", path)],
        );
    }

    pub fn sensitive_data_access(&self, actor: &str, ip: Option<&str>, resource: &str) {
        self.emit(
            AuditKind::SensitiveDataAccess,
            actor,
            ip,
            None,
            &[("resource", resource)],
        );
    }

    pub fn rate_limit_exceeded(&self, identifier: &str, ip: Option<&str>, policy: &str) {
        self.emit(
            AuditKind::RateLimitExceeded,
            identifier,
            ip,
            None,
            &[("policy", policy)],
        );
    }
}
