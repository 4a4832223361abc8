//! Notification phase: best effort, never fails the decision.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::hooks::Notification;
use super::outcome::NotificationSummary;
use crate::domains::events::Event;
use crate::kernel::ServerDeps;

enum Delivery {
    Sent,
    NoAddress,
}

/// Resolve each recipient's address and send. The lookup and the send for
/// one notification share a single `timeout`.
///
/// Failures are logged and counted, never returned.
pub async fn dispatch(
    deps: &ServerDeps,
    event: &Event,
    notifications: Vec<Notification>,
    timeout: Duration,
) -> NotificationSummary {
    let mut summary = NotificationSummary::default();

    for notification in notifications {
        match tokio::time::timeout(timeout, deliver(deps, &notification)).await {
            Ok(Ok(Delivery::Sent)) => {
                info!(event_id = %event.id, subject = %notification.subject, "Notification sent");
                summary.sent += 1;
            }
            Ok(Ok(Delivery::NoAddress)) => {
                debug!(
                    event_id = %event.id,
                    recipient = %notification.recipient,
                    "Recipient has no email address; notification skipped"
                );
                summary.skipped += 1;
            }
            Ok(Err(e)) => {
                warn!(
                    event_id = %event.id,
                    recipient = %notification.recipient,
                    error = %format!("{:#}", e),
                    "Notification failed"
                );
                summary.failed += 1;
            }
            Err(_) => {
                warn!(
                    event_id = %event.id,
                    recipient = %notification.recipient,
                    timeout_ms = timeout.as_millis() as u64,
                    "Notification timed out"
                );
                summary.failed += 1;
            }
        }
    }

    summary
}

async fn deliver(deps: &ServerDeps, notification: &Notification) -> Result<Delivery> {
    let contact = deps
        .users
        .get_user_contact(notification.recipient)
        .await
        .context("Could not resolve notification recipient")?;

    let Some(address) = contact.and_then(|c| c.email) else {
        return Ok(Delivery::NoAddress);
    };

    deps.notifier
        .send(&address, &notification.subject, &notification.body)
        .await?;
    Ok(Delivery::Sent)
}
