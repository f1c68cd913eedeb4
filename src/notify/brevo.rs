//! Brevo transactional email API sender.

use super::{Delivery, Mailer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Sends email through the Brevo HTTP API with a bounded timeout per
/// attempt. Every failure mode (timeout, transport error, non-2xx) resolves
/// to a failed [`Delivery`], never an error.
pub struct BrevoMailer {
    client: Client,
    api_key: SecretString,
    from_address: String,
    from_name: String,
}

impl BrevoMailer {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        api_key: SecretString,
        from_address: String,
        from_name: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build Brevo HTTP client")?;

        Ok(Self {
            client,
            api_key,
            from_address,
            from_name,
        })
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Delivery {
        let payload = json!({
            "sender": {
                "name": self.from_name,
                "email": self.from_address,
            },
            "to": [
                {"email": to_email, "name": to_name}
            ],
            "subject": subject,
            "htmlContent": html_body,
        });

        debug!(to_email = %to_email, subject = %subject, "dispatching email via Brevo");

        let response = self
            .client
            .post(BREVO_API_URL)
            .header("accept", "application/json")
            .header("api-key", self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                Delivery::sent(format!("accepted with status {}", response.status()))
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "Brevo rejected the send");
                Delivery::failed(format!("Brevo API error: {status} - {body}"))
            }
            Err(err) if err.is_timeout() => {
                warn!("email service timeout");
                Delivery::failed("email service timeout")
            }
            Err(err) => {
                warn!("email transport error: {err}");
                Delivery::failed(format!("email transport error: {err}"))
            }
        }
    }
}
