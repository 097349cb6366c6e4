//! Billing event payloads and the mapping onto shop subscription state.
//!
//! The mapping is pure: `(event type, payload)` in, either a shop-row update
//! or an ignore decision out. Database effects live in the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{SubscriptionStatus, SubscriptionTier};

/// An inbound webhook event, after signature verification.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl BillingEvent {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// The shop-row update a handled event maps to. Applying it is a plain
/// field-set, so re-applying the same update is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionUpdate {
    pub shop_id: Uuid,
    pub tier: Option<SubscriptionTier>,
    pub status: SubscriptionStatus,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

/// Result of mapping one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedEvent {
    Update(SubscriptionUpdate),
    /// Event carries nothing for us: unhandled type, or required metadata
    /// is absent. Carries the reason for the log line.
    Ignored(&'static str),
}

/// Map `(event type, payload)` to a shop subscription update.
///
/// Events missing shop metadata are ignored, never errors: the provider
/// retries failures, and retrying a payload that can never identify a shop
/// is pointless.
pub fn map_event(event: &BillingEvent) -> MappedEvent {
    let object = &event.data.object;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let Some(shop_id) = shop_id_from(object) else {
                return MappedEvent::Ignored("missing shop metadata");
            };
            let Some(tier) = tier_from(object) else {
                return MappedEvent::Ignored("missing tier metadata");
            };
            MappedEvent::Update(SubscriptionUpdate {
                shop_id,
                tier: Some(tier),
                status: SubscriptionStatus::Active,
                customer_id: str_field(object, "customer"),
                subscription_id: str_field(object, "subscription"),
            })
        }

        "customer.subscription.created" | "customer.subscription.updated" => {
            let Some(shop_id) = shop_id_from(object) else {
                return MappedEvent::Ignored("missing shop metadata");
            };
            let Some(tier) = tier_from(object) else {
                return MappedEvent::Ignored("missing tier metadata");
            };
            let status = match str_field(object, "status").as_deref() {
                Some("past_due") | Some("unpaid") => SubscriptionStatus::PastDue,
                Some("canceled") => SubscriptionStatus::Canceled,
                _ => SubscriptionStatus::Active,
            };
            MappedEvent::Update(SubscriptionUpdate {
                shop_id,
                tier: Some(tier),
                status,
                customer_id: str_field(object, "customer"),
                subscription_id: str_field(object, "id"),
            })
        }

        "customer.subscription.deleted" => {
            let Some(shop_id) = shop_id_from(object) else {
                return MappedEvent::Ignored("missing shop metadata");
            };
            // Tier is retained until the period ends; the provider owns the ledger
            MappedEvent::Update(SubscriptionUpdate {
                shop_id,
                tier: None,
                status: SubscriptionStatus::Canceled,
                customer_id: str_field(object, "customer"),
                subscription_id: str_field(object, "id"),
            })
        }

        "invoice.payment_failed" => {
            let Some(shop_id) = shop_id_from(object) else {
                return MappedEvent::Ignored("missing shop metadata");
            };
            MappedEvent::Update(SubscriptionUpdate {
                shop_id,
                tier: None,
                status: SubscriptionStatus::PastDue,
                customer_id: str_field(object, "customer"),
                subscription_id: str_field(object, "subscription"),
            })
        }

        _ => MappedEvent::Ignored("unhandled event type"),
    }
}

/// Shop id from `metadata.shop_id`, falling back to the subscription
/// metadata an invoice payload embeds.
fn shop_id_from(object: &Value) -> Option<Uuid> {
    let direct = object
        .get("metadata")
        .and_then(|m| m.get("shop_id"))
        .and_then(|v| v.as_str());

    let via_subscription = object
        .get("subscription_details")
        .and_then(|d| d.get("metadata"))
        .and_then(|m| m.get("shop_id"))
        .and_then(|v| v.as_str());

    direct
        .or(via_subscription)
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn tier_from(object: &Value) -> Option<SubscriptionTier> {
    object
        .get("metadata")
        .and_then(|m| m.get("tier"))
        .and_then(|v| v.as_str())
        .and_then(SubscriptionTier::parse)
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(|v| v.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: Value) -> BillingEvent {
        BillingEvent {
            id: "evt_1".to_string(),
            event_type: event_type.to_string(),
            data: EventData { object },
        }
    }

    const SHOP: &str = "6f2b9a34-9c1d-4a6e-8a6e-0d6c1f2b9a34";

    #[test]
    fn checkout_completed_maps_to_active_tier() {
        let e = event(
            "checkout.session.completed",
            json!({
                "id": "cs_123",
                "customer": "cus_9",
                "subscription": "sub_9",
                "metadata": { "shop_id": SHOP, "tier": "pro" }
            }),
        );

        let MappedEvent::Update(update) = map_event(&e) else {
            panic!("expected update");
        };
        assert_eq!(update.shop_id, Uuid::parse_str(SHOP).unwrap());
        assert_eq!(update.tier, Some(SubscriptionTier::Pro));
        assert_eq!(update.status, SubscriptionStatus::Active);
        assert_eq!(update.customer_id.as_deref(), Some("cus_9"));
        assert_eq!(update.subscription_id.as_deref(), Some("sub_9"));
    }

    #[test]
    fn subscription_deleted_cancels_but_keeps_tier() {
        let e = event(
            "customer.subscription.deleted",
            json!({
                "id": "sub_9",
                "customer": "cus_9",
                "metadata": { "shop_id": SHOP }
            }),
        );

        let MappedEvent::Update(update) = map_event(&e) else {
            panic!("expected update");
        };
        assert_eq!(update.tier, None);
        assert_eq!(update.status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn payment_failed_reads_metadata_through_subscription_details() {
        let e = event(
            "invoice.payment_failed",
            json!({
                "id": "in_5",
                "subscription": "sub_9",
                "subscription_details": { "metadata": { "shop_id": SHOP } }
            }),
        );

        let MappedEvent::Update(update) = map_event(&e) else {
            panic!("expected update");
        };
        assert_eq!(update.status, SubscriptionStatus::PastDue);
        assert_eq!(update.subscription_id.as_deref(), Some("sub_9"));
    }

    #[test]
    fn missing_shop_metadata_is_ignored() {
        let e = event(
            "checkout.session.completed",
            json!({ "id": "cs_123", "metadata": { "tier": "pro" } }),
        );
        assert_eq!(map_event(&e), MappedEvent::Ignored("missing shop metadata"));
    }

    #[test]
    fn missing_tier_metadata_is_ignored() {
        let e = event(
            "customer.subscription.updated",
            json!({ "id": "sub_9", "metadata": { "shop_id": SHOP } }),
        );
        assert_eq!(map_event(&e), MappedEvent::Ignored("missing tier metadata"));
    }

    #[test]
    fn unhandled_types_are_ignored() {
        let e = event("charge.refunded", json!({}));
        assert_eq!(map_event(&e), MappedEvent::Ignored("unhandled event type"));
    }

    #[test]
    fn mapping_is_deterministic() {
        let e = event(
            "checkout.session.completed",
            json!({
                "id": "cs_123",
                "customer": "cus_9",
                "subscription": "sub_9",
                "metadata": { "shop_id": SHOP, "tier": "studio" }
            }),
        );
        // The same payload always maps to the same update
        assert_eq!(map_event(&e), map_event(&e));
    }
}
