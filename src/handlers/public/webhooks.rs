use axum::{body::Bytes, http::HeaderMap};
use serde_json::{json, Value};

use crate::billing::{
    map_event, BillingEvent, MappedEvent, PgBillingStore, Reconciler, VerificationError,
    WebhookOutcome, WebhookVerifier,
};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /webhooks/billing - inbound billing provider events
///
/// Signature check first, then parse, then reconcile. Ignored events still
/// answer 200 so the provider does not retry payloads that can never land.
pub async fn billing_post(headers: HeaderMap, body: Bytes) -> ApiResult<Value> {
    let billing = &config::config().billing;
    if billing.webhook_secret.is_empty() {
        return Err(ApiError::service_unavailable("Billing webhooks not configured"));
    }

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing stripe-signature header"))?;

    let verifier = WebhookVerifier::new(&billing.webhook_secret, billing.webhook_tolerance_secs);
    verifier.verify(&body, signature).map_err(|e| match e {
        VerificationError::SignatureMismatch | VerificationError::TimestampOutOfTolerance => {
            tracing::warn!("Rejected billing webhook: {}", e);
            ApiError::unauthorized("Invalid webhook signature")
        }
        _ => ApiError::bad_request("Malformed signature header"),
    })?;

    let event = BillingEvent::from_slice(&body).map_err(|e| {
        tracing::warn!("Failed to parse billing webhook payload: {}", e);
        ApiError::bad_request("Malformed webhook payload")
    })?;

    // Map before touching the database: events we will never act on answer
    // 200 without requiring a healthy pool
    let update = match map_event(&event) {
        MappedEvent::Update(update) => update,
        MappedEvent::Ignored(reason) => {
            tracing::info!("Ignoring billing event {} ({}): {}", event.id, event.event_type, reason);
            return Ok(ApiResponse::success(json!({ "outcome": "ignored" })));
        }
    };

    let pool = DatabaseManager::pool().await?;
    let reconciler = Reconciler::new(PgBillingStore::new(pool));
    let outcome = reconciler.apply(&event.id, &update).await.map_err(|e| {
        tracing::error!("Billing reconciliation failed for event {}: {}", event.id, e);
        ApiError::internal_server_error("Failed to process webhook")
    })?;

    let outcome = match outcome {
        WebhookOutcome::Processed => "processed",
        WebhookOutcome::AlreadyProcessed => "already_processed",
        WebhookOutcome::Ignored => "ignored",
    };

    Ok(ApiResponse::success(json!({ "outcome": outcome })))
}
