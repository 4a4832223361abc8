use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::BaseNotifier;

/// Sends mail through an HTTP relay that accepts JSON messages.
pub struct MailRelayClient {
    client: Client,
    endpoint: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl MailRelayClient {
    pub fn new(endpoint: String, from: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            from,
        }
    }
}

#[async_trait]
impl BaseNotifier for MailRelayClient {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = RelayMessage {
            from: &self.from,
            to,
            subject,
            html: body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .context("Mail relay request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Mail relay rejected message: {}", body);
            anyhow::bail!("Mail relay error {}: {}", status, body);
        }

        info!(to, subject, "Mail handed to relay");
        Ok(())
    }
}

/// Notifier for environments without a relay: messages only reach the log.
pub struct LoggingNotifier;

#[async_trait]
impl BaseNotifier for LoggingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(to, subject, body_len = body.len(), "Mail relay not configured; notification logged");
        Ok(())
    }
}
