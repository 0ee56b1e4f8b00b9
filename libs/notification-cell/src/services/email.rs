// libs/notification-cell/src/services/email.rs
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::NotificationError;

/// Client for the outbound email HTTP API. When the API is not configured
/// the send degrades to a log line; the queue and outbox bookkeeping around
/// it behave identically either way.
pub struct EmailClient {
    client: Client,
    api_url: String,
    api_token: String,
    from_address: String,
}

impl EmailClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.email_api_url.clone(),
            api_token: config.email_api_token.clone(),
            from_address: config.email_from_address.clone(),
        }
    }

    pub async fn send(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        if self.api_url.is_empty() {
            debug!(
                "Email delivery disabled, skipping send to {} ({})",
                recipient_email, subject
            );
            return Ok(());
        }

        let payload = json!({
            "from": self.from_address,
            "to": [{ "email": recipient_email, "name": recipient_name }],
            "subject": subject,
            "text": body
        });

        let response = self
            .client
            .post(format!("{}/send", self.api_url))
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::EmailError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Email API error ({}): {}", status, error_text);
            return Err(NotificationError::EmailError(format!(
                "Email API returned {}: {}",
                status, error_text
            )));
        }

        debug!("Email sent to {}: {}", recipient_email, subject);
        Ok(())
    }
}
