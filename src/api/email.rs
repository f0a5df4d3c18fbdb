//! Email delivery abstraction.
//!
//! Actual delivery (SMTP, API) is an external collaborator; this subsystem
//! only hands a message to an `EmailSender`. The default sender for local
//! dev logs the payload instead of sending real email.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub payload_json: String,
}

/// Email delivery abstraction used by the password-reset flow.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error.
    ///
    /// # Errors
    /// Returns an error if delivery fails.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Copy, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            payload = %message.payload_json,
            "email send stub"
        );
        Ok(())
    }
}

/// Build the frontend reset link included in outbound emails.
pub(crate) fn build_reset_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/reset-password#token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_reset_url_trims_trailing_slash() {
        let url = build_reset_url("https://trips.example.com/", "token");
        assert_eq!(url, "https://trips.example.com/reset-password#token=token");
    }

    #[test]
    fn log_sender_always_succeeds() {
        let message = EmailMessage {
            to_email: "alice@example.com".to_string(),
            subject: "Reset your password".to_string(),
            payload_json: "{}".to_string(),
        };
        assert!(LogEmailSender.send(&message).is_ok());
    }
}
