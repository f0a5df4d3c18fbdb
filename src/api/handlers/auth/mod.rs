//! Request admission and credential lifecycle.
//!
//! Control flow for every inbound request: rate-limit gate, then (for login)
//! credential validation and token issue, then token extraction on each
//! authenticated request. The audit logger receives events from every stage.

pub(crate) mod audit;
pub(crate) mod error;
pub(crate) mod gate;
pub(crate) mod login;
pub(crate) mod me;
mod password;
pub(crate) mod password_reset;
pub(crate) mod rate_limit;
pub(crate) mod state;
mod storage;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod user_register;
mod utils;
pub mod validation;

pub use audit::{AuditKind, AuditLogger};
pub use rate_limit::{
    FixedWindowLimiter, NoopRateLimiter, PolicyRule, RateLimitConfig, RateLimitDecision,
    RateLimitPolicy, RateLimiter,
};
pub use state::{AuthConfig, AuthState};
pub use token::TokenIssuer;
