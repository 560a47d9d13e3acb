//! Email outbox
//!
//! Every notification email is written to the outbox before delivery is
//! attempted. A failed attempt leaves the record `failed`; the relay retries
//! due records until they are sent or run out of attempts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::crypto::generate_id;
use crate::email::{EmailMessage, EmailSender};
use crate::store::{NotificationStore, OutboxMessage, OutboxStatus};

/// Outcome of one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Try to deliver one outbox record and persist the result
///
/// Returns the delivery error, if any.
pub fn deliver<D, E>(store: &D, sender: &E, mut message: OutboxMessage) -> Result<(), String>
where
    D: NotificationStore + ?Sized,
    E: EmailSender + ?Sized,
{
    let email = EmailMessage {
        to: message.recipient.clone(),
        subject: message.subject.clone(),
        html_body: message.html_body.clone(),
        text_body: message.text_body.clone(),
    };

    let result = sender.send(&email);
    message.attempts += 1;
    message.updated_at = Utc::now();
    match &result {
        Ok(()) => {
            message.status = OutboxStatus::Sent;
            message.last_error = None;
        }
        Err(e) => {
            tracing::warn!(outbox_id = %message.id, attempts = message.attempts, error = %e, "Email delivery failed");
            message.status = OutboxStatus::Failed;
            message.last_error = Some(e.clone());
        }
    }

    if let Err(e) = store.update_outbox(&message) {
        tracing::error!(outbox_id = %message.id, error = %e, "Failed to record delivery result");
    }
    result
}

/// Enqueue a message and attempt delivery once
///
/// Never fails the caller: the primary write has already committed. Returns
/// a warning for the response when the email did not go out.
pub fn dispatch<D, E>(store: &D, sender: &E, email: EmailMessage) -> Option<String>
where
    D: NotificationStore + ?Sized,
    E: EmailSender + ?Sized,
{
    let now = Utc::now();
    let message = OutboxMessage {
        id: generate_id(),
        recipient: email.to,
        subject: email.subject,
        html_body: email.html_body,
        text_body: email.text_body,
        status: OutboxStatus::Pending,
        attempts: 0,
        last_error: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = store.enqueue_email(&message) {
        tracing::error!(recipient = %message.recipient, error = %e, "Failed to enqueue email");
        return Some(format!("Notification email to {} could not be queued", message.recipient));
    }

    let recipient = message.recipient.clone();
    match deliver(store, sender, message) {
        Ok(()) => None,
        Err(_) => Some(format!(
            "Notification email to {} could not be sent yet; it will be retried",
            recipient
        )),
    }
}

/// Dispatch several messages, joining any warnings
pub fn dispatch_all<D, E, I>(store: &D, sender: &E, emails: I) -> Option<String>
where
    D: NotificationStore + ?Sized,
    E: EmailSender + ?Sized,
    I: IntoIterator<Item = EmailMessage>,
{
    let warnings: Vec<String> = emails
        .into_iter()
        .filter_map(|email| dispatch(store, sender, email))
        .collect();

    if warnings.is_empty() {
        None
    } else {
        Some(warnings.join("; "))
    }
}

/// Retry every due record once
///
/// Each record is claimed before delivery so that an attempt already in
/// flight, or a concurrent pass, is never sent twice.
pub fn relay_due<D, E>(store: &D, sender: &E, max_attempts: i64) -> RelayReport
where
    D: NotificationStore + ?Sized,
    E: EmailSender + ?Sized,
{
    let due = match store.due_outbox(max_attempts) {
        Ok(due) => due,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load outbox");
            return RelayReport::default();
        }
    };

    let mut report = RelayReport::default();
    for message in due {
        match store.claim_outbox(&message.id, max_attempts) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::error!(outbox_id = %message.id, error = %e, "Failed to claim outbox message");
                continue;
            }
        }
        report.attempted += 1;
        match deliver(store, sender, message) {
            Ok(()) => report.sent += 1,
            Err(_) => report.failed += 1,
        }
    }
    report
}

/// Background relay loop
pub async fn run_relay<D, E>(store: Arc<D>, sender: Arc<E>, interval: Duration, max_attempts: i64)
where
    D: NotificationStore + 'static,
    E: EmailSender + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let store = store.clone();
        let sender = sender.clone();
        let result = tokio::task::spawn_blocking(move || {
            relay_due(store.as_ref(), sender.as_ref(), max_attempts)
        })
        .await;

        match result {
            Ok(report) if report.attempted > 0 => {
                tracing::info!(
                    attempted = report.attempted,
                    sent = report.sent,
                    failed = report.failed,
                    "Outbox relay pass"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Outbox relay task failed"),
        }
    }
}
