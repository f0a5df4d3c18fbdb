//! Fixed-window rate limiting primitives for request admission.
//!
//! Counters are keyed by `(policy, identifier)` and live behind a single
//! injected store so tests can use isolated instances. Consumption is
//! consume-then-reject: a rejected request still burns a unit, so hammering
//! never gets free retries.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitPolicy {
    /// Login attempts, keyed by username.
    Login,
    /// General API traffic, keyed by client IP.
    Api,
    /// Abuse-prone endpoints (register, password reset), keyed by client IP.
    ProtectedApi,
}

impl RateLimitPolicy {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Api => "api",
            Self::ProtectedApi => "protected_api",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Budget for a single policy: `max_per_window` consumptions per `window`.
#[derive(Clone, Copy, Debug)]
pub struct PolicyRule {
    window: Duration,
    max_per_window: u32,
}

impl PolicyRule {
    #[must_use]
    pub const fn new(window: Duration, max_per_window: u32) -> Self {
        Self {
            window,
            max_per_window,
        }
    }
}

/// Recognized policies and their budgets, validated at startup.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    login: PolicyRule,
    api: PolicyRule,
    protected_api: PolicyRule,
}

impl RateLimitConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            login: PolicyRule::new(Duration::from_secs(15 * 60), 5),
            api: PolicyRule::new(Duration::from_secs(60), 60),
            protected_api: PolicyRule::new(Duration::from_secs(60 * 60), 10),
        }
    }

    #[must_use]
    pub const fn with_login(mut self, rule: PolicyRule) -> Self {
        self.login = rule;
        self
    }

    #[must_use]
    pub const fn with_api(mut self, rule: PolicyRule) -> Self {
        self.api = rule;
        self
    }

    #[must_use]
    pub const fn with_protected_api(mut self, rule: PolicyRule) -> Self {
        self.protected_api = rule;
        self
    }

    #[must_use]
    pub const fn rule(&self, policy: RateLimitPolicy) -> PolicyRule {
        match policy {
            RateLimitPolicy::Login => self.login,
            RateLimitPolicy::Api => self.api,
            RateLimitPolicy::ProtectedApi => self.protected_api,
        }
    }

    /// Reject zero windows or zero budgets before the server starts.
    ///
    /// # Errors
    /// Returns an error naming the first invalid policy.
    pub fn validate(&self) -> Result<()> {
        for policy in [
            RateLimitPolicy::Login,
            RateLimitPolicy::Api,
            RateLimitPolicy::ProtectedApi,
        ] {
            let rule = self.rule(policy);
            if rule.window.is_zero() {
                bail!("rate limit policy {} has a zero window", policy.name());
            }
            if rule.max_per_window == 0 {
                bail!("rate limit policy {} has a zero budget", policy.name());
            }
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check-and-consume primitive shared by the gate and the login flow.
pub trait RateLimiter: Send + Sync {
    fn consume(&self, policy: RateLimitPolicy, identifier: &str) -> RateLimitDecision;
}

/// Limiter that always allows; used in tests and as a wiring default.
#[derive(Clone, Copy, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn consume(&self, _policy: RateLimitPolicy, _identifier: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    started_at: Instant,
}

#[derive(Debug)]
struct WindowStore {
    windows: HashMap<(RateLimitPolicy, String), Window>,
    last_sweep: Instant,
}

/// In-memory fixed-window counter store.
///
/// The mutex serializes increment-and-compare per key, so two concurrent
/// requests for the same identifier never both observe "room available" when
/// only one unit remains. Counters are created lazily and reset in place when
/// their window elapses; keys whose window has expired are swept out of the
/// map at most one sweep-interval later, so an attacker rotating identifiers
/// cannot grow the map without bound. State is per-process; a horizontally
/// scaled deployment would swap this for a shared store behind the same
/// trait.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    sweep_interval: Duration,
    store: Mutex<WindowStore>,
}

impl FixedWindowLimiter {
    /// Build a limiter from a validated config.
    ///
    /// # Errors
    /// Returns an error if the config fails validation.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        config.validate()?;
        // Sweep at the shortest window: a stale key lives at most two windows.
        let sweep_interval = [
            RateLimitPolicy::Login,
            RateLimitPolicy::Api,
            RateLimitPolicy::ProtectedApi,
        ]
        .into_iter()
        .map(|policy| config.rule(policy).window)
        .min()
        .unwrap_or(Duration::from_secs(60));

        Ok(Self {
            config,
            sweep_interval,
            store: Mutex::new(WindowStore {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        })
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn consume(&self, policy: RateLimitPolicy, identifier: &str) -> RateLimitDecision {
        let rule = self.config.rule(policy);
        let now = Instant::now();

        let mut store = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if now.duration_since(store.last_sweep) >= self.sweep_interval {
            let config = self.config;
            store.windows.retain(|(policy, _), window| {
                now.duration_since(window.started_at) < config.rule(*policy).window
            });
            store.last_sweep = now;
        }

        let window = store
            .windows
            .entry((policy, identifier.to_string()))
            .or_insert(Window {
                count: 0,
                started_at: now,
            });

        if now.duration_since(window.started_at) >= rule.window {
            window.count = 0;
            window.started_at = now;
        }

        // Saturating keeps a hammered counter from overflowing within a window.
        window.count = window.count.saturating_add(1);

        if window.count > rule.max_per_window {
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window: Duration, max: u32) -> FixedWindowLimiter {
        let config = RateLimitConfig::new()
            .with_login(PolicyRule::new(window, max))
            .with_api(PolicyRule::new(window, max))
            .with_protected_api(PolicyRule::new(window, max));
        FixedWindowLimiter::new(config).unwrap()
    }

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.consume(RateLimitPolicy::Login, "alice"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn rejects_after_budget_is_spent() {
        let limiter = limiter(Duration::from_secs(60), 3);
        for _ in 0..3 {
            assert_eq!(
                limiter.consume(RateLimitPolicy::Api, "10.0.0.1"),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.consume(RateLimitPolicy::Api, "10.0.0.1"),
            RateLimitDecision::Limited
        );
        // Consume-then-reject: further attempts stay limited within the window.
        assert_eq!(
            limiter.consume(RateLimitPolicy::Api, "10.0.0.1"),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn identifiers_do_not_share_windows() {
        let limiter = limiter(Duration::from_secs(60), 1);
        assert_eq!(
            limiter.consume(RateLimitPolicy::Api, "10.0.0.1"),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.consume(RateLimitPolicy::Api, "10.0.0.1"),
            RateLimitDecision::Limited
        );
        assert_eq!(
            limiter.consume(RateLimitPolicy::Api, "10.0.0.2"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn policies_do_not_share_windows() {
        let limiter = limiter(Duration::from_secs(60), 1);
        assert_eq!(
            limiter.consume(RateLimitPolicy::Api, "alice"),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.consume(RateLimitPolicy::Login, "alice"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn window_elapse_resets_the_counter() {
        let limiter = limiter(Duration::from_millis(20), 1);
        assert_eq!(
            limiter.consume(RateLimitPolicy::ProtectedApi, "10.0.0.1"),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.consume(RateLimitPolicy::ProtectedApi, "10.0.0.1"),
            RateLimitDecision::Limited
        );
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(
            limiter.consume(RateLimitPolicy::ProtectedApi, "10.0.0.1"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn stale_identifiers_are_evicted() {
        let limiter = limiter(Duration::from_millis(10), 1);
        for i in 0..100 {
            limiter.consume(RateLimitPolicy::Api, &format!("10.0.0.{i}"));
        }
        std::thread::sleep(Duration::from_millis(25));

        // The next consume sweeps every expired key before inserting its own.
        limiter.consume(RateLimitPolicy::Api, "fresh");
        let stored = limiter.store.lock().unwrap().windows.len();
        assert_eq!(stored, 1);
    }

    #[test]
    fn validate_rejects_zero_window() {
        let config =
            RateLimitConfig::new().with_api(PolicyRule::new(Duration::from_secs(0), 10));
        assert!(config.validate().is_err());
        assert!(FixedWindowLimiter::new(config).is_err());
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let config =
            RateLimitConfig::new().with_login(PolicyRule::new(Duration::from_secs(60), 0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(RateLimitConfig::default().validate().is_ok());
    }

    #[test]
    fn policy_names_are_stable() {
        assert_eq!(RateLimitPolicy::Login.name(), "login");
        assert_eq!(RateLimitPolicy::Api.name(), "api");
        assert_eq!(RateLimitPolicy::ProtectedApi.name(), "protected_api");
    }
}
