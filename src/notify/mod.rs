//! Outbound email delivery.
//!
//! Delivery is best effort by design: [`Mailer::send`] resolves every
//! transport failure into a [`Delivery`] value instead of an error, so
//! callers inspect the outcome for logging and response metadata but never
//! branch their own success on it. The OTP ledger row written before the
//! send is the source of truth for the reset flow.
//!
//! The default sender for local dev is [`LogMailer`], which logs the message
//! and reports success. Production uses [`BrevoMailer`].

use async_trait::async_trait;
use tracing::info;

mod brevo;

pub use brevo::BrevoMailer;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivered: bool,
    pub detail: String,
}

impl Delivery {
    #[must_use]
    pub fn sent(detail: impl Into<String>) -> Self {
        Self {
            delivered: true,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            delivered: false,
            detail: detail.into(),
        }
    }
}

/// Email delivery abstraction.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Attempt delivery. Must not panic or return through control flow;
    /// any transport failure resolves to `delivered = false`.
    async fn send(&self, to_email: &str, to_name: &str, subject: &str, html_body: &str)
        -> Delivery;
}

/// Local dev mailer that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        _html_body: &str,
    ) -> Delivery {
        info!(
            to_email = %to_email,
            to_name = %to_name,
            subject = %subject,
            "email send stub"
        );
        Delivery::sent("logged")
    }
}

/// Subject and HTML body for the password-reset OTP email.
#[must_use]
pub fn otp_message(name: &str, code: &str, window_minutes: i64) -> (String, String) {
    let subject = "Pustak - Password Reset OTP".to_string();
    let body = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Hello {name},</h2>
    <p>You requested to reset your password for your Pustak account.</p>
    <p>Your One-Time Password (OTP) is:</p>
    <div style="border: 2px solid #4299e1; padding: 20px; text-align: center; border-radius: 8px;">
      <span style="font-size: 32px; font-weight: bold; letter-spacing: 5px;">{code}</span>
    </div>
    <p><strong>This OTP is valid for {window_minutes} minutes.</strong></p>
    <p>If you didn't request this password reset, please ignore this email.</p>
    <p>This is an automated email. Please do not reply.</p>
  </div>
</body>
</html>"#
    );

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_reports_success() {
        let delivery = LogMailer
            .send("a@x.com", "Asha", "subject", "<p>body</p>")
            .await;
        assert!(delivery.delivered);
        assert_eq!(delivery.detail, "logged");
    }

    #[test]
    fn otp_message_embeds_code_and_window() {
        let (subject, body) = otp_message("Asha", "042917", 10);
        assert!(subject.contains("Password Reset OTP"));
        assert!(body.contains("042917"));
        assert!(body.contains("valid for 10 minutes"));
        assert!(body.contains("Hello Asha"));
    }
}
