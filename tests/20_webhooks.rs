//! Webhook signature verification and reconciliation behavior tests

mod common;

use anyhow::Result;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use inkline_api::billing::{
    BillingEvent, MemoryBillingStore, Reconciler, ShopBillingState, WebhookOutcome,
    WebhookVerifier,
};

type HmacSha256 = Hmac<Sha256>;

/// Get current Unix timestamp (for webhook signature headers)
fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = current_timestamp();
    format!("t={},v1={}", timestamp, compute_signature(payload, secret, timestamp))
}

// ============ Signature Verification ============

#[test]
fn valid_signature_is_accepted() {
    let verifier = WebhookVerifier::new(common::WEBHOOK_SECRET, 300);
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = signature_header(payload, common::WEBHOOK_SECRET);

    assert!(verifier.verify(payload, &header).is_ok());
}

#[test]
fn wrong_secret_is_rejected() {
    let verifier = WebhookVerifier::new(common::WEBHOOK_SECRET, 300);
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = signature_header(payload, "wrong_secret");

    assert!(verifier.verify(payload, &header).is_err());
}

#[test]
fn modified_payload_is_rejected() {
    let verifier = WebhookVerifier::new(common::WEBHOOK_SECRET, 300);
    let original = br#"{"type":"checkout.session.completed"}"#;
    let modified = br#"{"type":"checkout.session.completed","hacked":true}"#;
    let header = signature_header(original, common::WEBHOOK_SECRET);

    assert!(verifier.verify(modified, &header).is_err());
}

#[test]
fn old_timestamp_is_rejected() {
    let verifier = WebhookVerifier::new(common::WEBHOOK_SECRET, 300);
    let payload = br#"{"type":"checkout.session.completed"}"#;
    // 10 minutes ago - beyond the 5-minute tolerance
    let timestamp = current_timestamp() - 600;
    let header = format!(
        "t={},v1={}",
        timestamp,
        compute_signature(payload, common::WEBHOOK_SECRET, timestamp)
    );

    assert!(verifier.verify(payload, &header).is_err());
}

#[test]
fn unicode_payload_round_trips() {
    let verifier = WebhookVerifier::new(common::WEBHOOK_SECRET, 300);
    let payload = "{\"customer_name\":\"日本語\",\"emoji\":\"🎉\"}".as_bytes();
    let header = signature_header(payload, common::WEBHOOK_SECRET);

    assert!(verifier.verify(payload, &header).is_ok());
}

// ============ Reconciliation (in-memory store) ============

fn checkout_payload(shop_id: Uuid, tier: &str) -> serde_json::Value {
    json!({
        "id": "evt_checkout_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": { "shop_id": shop_id.to_string(), "tier": tier }
            }
        }
    })
}

async fn seeded_store(shop_id: Uuid) -> MemoryBillingStore {
    let store = MemoryBillingStore::new();
    store
        .insert_shop(
            shop_id,
            ShopBillingState {
                tier: "free".to_string(),
                status: "active".to_string(),
                customer_id: None,
                subscription_id: None,
            },
        )
        .await;
    store
}

#[tokio::test]
async fn replayed_event_is_not_applied_twice() -> Result<()> {
    let shop_id = Uuid::new_v4();
    let store = seeded_store(shop_id).await;
    let reconciler = Reconciler::new(store.clone());

    let payload = serde_json::to_vec(&checkout_payload(shop_id, "pro"))?;
    let event = BillingEvent::from_slice(&payload)?;

    let first = reconciler.handle_event(&event).await?;
    assert_eq!(first, WebhookOutcome::Processed);
    let state_after_first = store.shop_state(shop_id).await.unwrap();

    // Replay the SAME event (same event id)
    let second = reconciler.handle_event(&event).await?;
    assert_eq!(second, WebhookOutcome::AlreadyProcessed);

    let state_after_second = store.shop_state(shop_id).await.unwrap();
    assert_eq!(
        state_after_first, state_after_second,
        "shop state must not change on replay"
    );
    assert_eq!(state_after_second.tier, "pro");
    Ok(())
}

#[tokio::test]
async fn cancellation_keeps_tier_until_period_end() -> Result<()> {
    let shop_id = Uuid::new_v4();
    let store = seeded_store(shop_id).await;
    let reconciler = Reconciler::new(store.clone());

    // Subscribe, then cancel
    let checkout = serde_json::to_vec(&checkout_payload(shop_id, "studio"))?;
    reconciler
        .handle_event(&BillingEvent::from_slice(&checkout)?)
        .await?;

    let cancel = serde_json::to_vec(&json!({
        "id": "evt_cancel_1",
        "type": "customer.subscription.deleted",
        "data": {
            "object": {
                "id": "sub_1",
                "customer": "cus_1",
                "metadata": { "shop_id": shop_id.to_string() }
            }
        }
    }))?;
    let outcome = reconciler
        .handle_event(&BillingEvent::from_slice(&cancel)?)
        .await?;
    assert_eq!(outcome, WebhookOutcome::Processed);

    let state = store.shop_state(shop_id).await.unwrap();
    assert_eq!(state.status, "canceled");
    // The provider owns the period; tier survives until it ends
    assert_eq!(state.tier, "studio");
    Ok(())
}

// ============ HTTP surface ============

#[tokio::test]
async fn webhook_without_signature_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/webhooks/billing", server.base_url))
        .header("content-type", "application/json")
        // No stripe-signature header!
        .body(serde_json::to_vec(&json!({"id": "evt_1", "type": "x", "data": {"object": {}}}))?)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn webhook_with_invalid_signature_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let payload = serde_json::to_vec(&json!({"id": "evt_1", "type": "x", "data": {"object": {}}}))?;
    let header = signature_header(&payload, "wrong_secret");

    let res = client
        .post(format!("{}/webhooks/billing", server.base_url))
        .header("content-type", "application/json")
        .header("stripe-signature", header)
        .body(payload)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn webhook_missing_metadata_is_acknowledged_not_retried() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // checkout event with no shop metadata: must answer 200 so the provider
    // stops retrying, and must not touch the database
    let payload = serde_json::to_vec(&json!({
        "id": "evt_no_meta",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_1", "metadata": {} } }
    }))?;
    let header = signature_header(&payload, common::WEBHOOK_SECRET);

    let res = client
        .post(format!("{}/webhooks/billing", server.base_url))
        .header("content-type", "application/json")
        .header("stripe-signature", header)
        .body(payload)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["outcome"], "ignored");
    Ok(())
}

#[tokio::test]
async fn webhook_with_unhandled_type_is_acknowledged() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let payload = serde_json::to_vec(&json!({
        "id": "evt_other",
        "type": "charge.refunded",
        "data": { "object": {} }
    }))?;
    let header = signature_header(&payload, common::WEBHOOK_SECRET);

    let res = client
        .post(format!("{}/webhooks/billing", server.base_url))
        .header("content-type", "application/json")
        .header("stripe-signature", header)
        .body(payload)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["outcome"], "ignored");
    Ok(())
}
