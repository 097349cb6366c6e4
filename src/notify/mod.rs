//! Outbound SMS reminders through the external messaging provider.
//!
//! Delivery is best effort: a failed send is logged and never surfaces as an
//! API error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config;

#[async_trait]
pub trait SmsNotifier: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMS provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("SMS provider rejected message: {0}")]
    Rejected(String),
}

/// POSTs messages to the configured provider endpoint as JSON.
pub struct HttpSmsNotifier {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpSmsNotifier {
    pub fn from_config() -> Self {
        let notify = &config::config().notify;
        Self {
            client: reqwest::Client::new(),
            endpoint: notify.sms_endpoint.clone(),
            from: notify.sms_from.clone(),
        }
    }
}

#[async_trait]
impl SmsNotifier for HttpSmsNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "from": self.from,
                "to": to,
                "body": body,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().to_string()));
        }
        Ok(())
    }
}

/// Discards messages; used when SMS is disabled and in tests.
pub struct NoopNotifier;

#[async_trait]
impl SmsNotifier for NoopNotifier {
    async fn send(&self, _to: &str, _body: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Pick the notifier the current configuration calls for.
pub fn notifier_from_config() -> Box<dyn SmsNotifier> {
    let notify = &config::config().notify;
    if notify.sms_enabled && !notify.sms_endpoint.is_empty() {
        Box::new(HttpSmsNotifier::from_config())
    } else {
        Box::new(NoopNotifier)
    }
}

/// Reminder text for a booked session.
pub fn appointment_reminder(shop_name: &str, client_name: &str, starts_at: DateTime<Utc>) -> String {
    format!(
        "Hi {}, your session at {} is booked for {}. Reply to this message if you need to reschedule.",
        client_name,
        shop_name,
        starts_at.format("%b %-d, %-I:%M %p UTC"),
    )
}

/// Fire-and-forget a reminder; logs instead of failing the request.
pub async fn send_reminder(notifier: &dyn SmsNotifier, to: &str, body: &str) {
    if let Err(e) = notifier.send(to, body).await {
        tracing::warn!("Failed to send SMS reminder: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reminder_names_client_shop_and_time() {
        let when = Utc.with_ymd_and_hms(2026, 3, 14, 15, 30, 0).unwrap();
        let msg = appointment_reminder("Iron & Ink", "Sam", when);
        assert!(msg.contains("Sam"));
        assert!(msg.contains("Iron & Ink"));
        assert!(msg.contains("Mar 14"));
    }
}
