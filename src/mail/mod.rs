//! Outbound transactional email.
//!
//! DESIGN
//! ======
//! Services talk to a `Mailer` trait object held in `AppState`, so reminder
//! sweeps and access-code delivery can be exercised in tests without a
//! provider. Production uses Resend; when no API key is configured a
//! `DisabledMailer` is installed that fails every send, which leaves reminder
//! flags untouched so nothing is marked as delivered.

pub mod templates;

use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;

use crate::config::EmailConfig;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("email delivery is not configured")]
    Disabled,
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// A fully rendered message ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Provider-neutral async trait for sending email. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message and return the provider's message id.
    ///
    /// # Errors
    ///
    /// Returns a [`MailError`] if delivery is disabled or the provider rejects
    /// the request.
    async fn send(&self, email: OutgoingEmail) -> Result<String, MailError>;
}

// =============================================================================
// RESEND
// =============================================================================

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    #[must_use]
    pub fn new(api_key: &str, from: impl Into<String>) -> Self {
        Self { client: Resend::new(api_key), from: from.into() }
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String, MailError> {
        let to = [email.to.as_str()];
        let options = CreateEmailBaseOptions::new(&self.from, to, &email.subject)
            .with_html(&email.html)
            .with_text(&email.text);
        let response = self
            .client
            .emails
            .send(options)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        Ok(response.id.to_string())
    }
}

// =============================================================================
// DISABLED
// =============================================================================

pub struct DisabledMailer;

#[async_trait::async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String, MailError> {
        tracing::warn!(to = %email.to, subject = %email.subject, "email not sent: RESEND_API_KEY is not set");
        Err(MailError::Disabled)
    }
}

/// Pick the mailer implied by config.
#[must_use]
pub fn from_config(config: &EmailConfig) -> std::sync::Arc<dyn Mailer> {
    match &config.api_key {
        Some(key) => std::sync::Arc::new(ResendMailer::new(key, config.from.clone())),
        None => std::sync::Arc::new(DisabledMailer),
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================

#[cfg(test)]
pub mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Records every message; fails sends to addresses in `fail_for`.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub fail_for: Vec<String>,
    }

    impl RecordingMailer {
        pub fn failing_for(addresses: &[&str]) -> Self {
            Self { sent: Mutex::new(Vec::new()), fail_for: addresses.iter().map(|a| (*a).to_owned()).collect() }
        }

        pub fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<String, MailError> {
            if self.fail_for.contains(&email.to) {
                return Err(MailError::Delivery(format!("mailbox unavailable: {}", email.to)));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(email);
            Ok(format!("msg-{}", sent.len()))
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
