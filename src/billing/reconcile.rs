//! Webhook event reconciliation: idempotency check, event mapping, shop
//! update. Signature verification happens before any of this.

use tracing::{info, warn};

use super::events::{map_event, BillingEvent, MappedEvent};
use super::store::{ApplyResult, BillingStore, StoreError};

/// What happened to a verified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    AlreadyProcessed,
    Ignored,
}

/// Applies verified billing events to shop state, once each.
pub struct Reconciler<S: BillingStore> {
    store: S,
}

impl<S: BillingStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Process one verified event: map it, then apply.
    pub async fn handle_event(&self, event: &BillingEvent) -> Result<WebhookOutcome, StoreError> {
        match map_event(event) {
            MappedEvent::Update(update) => self.apply(&event.id, &update).await,
            MappedEvent::Ignored(reason) => {
                info!("Ignoring billing event {} ({}): {}", event.id, event.event_type, reason);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Apply a mapped update once. Safe under at-least-once delivery: the
    /// ledger drops exact re-deliveries, and the update itself is a plain
    /// field-set, so racing duplicates converge on the same state.
    pub async fn apply(
        &self,
        event_id: &str,
        update: &super::events::SubscriptionUpdate,
    ) -> Result<WebhookOutcome, StoreError> {
        if self.store.is_event_processed(event_id).await? {
            info!("Billing event {} already processed, skipping", event_id);
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        match self.store.apply_update(update).await? {
            ApplyResult::Applied => {
                self.store.mark_event_processed(event_id).await?;
                info!("Reconciled billing event {} onto shop {}", event_id, update.shop_id);
                Ok(WebhookOutcome::Processed)
            }
            ApplyResult::UnknownShop => {
                // Not marked processed: if the shop appears later the provider's
                // retry can still land
                warn!("Billing event {} names unknown shop {}, ignoring", event_id, update.shop_id);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::events::EventData;
    use crate::billing::store::{MemoryBillingStore, ShopBillingState};
    use serde_json::json;
    use uuid::Uuid;

    fn checkout_event(id: &str, shop_id: Uuid, tier: &str) -> BillingEvent {
        BillingEvent {
            id: id.to_string(),
            event_type: "checkout.session.completed".to_string(),
            data: EventData {
                object: json!({
                    "id": "cs_1",
                    "customer": "cus_1",
                    "subscription": "sub_1",
                    "metadata": { "shop_id": shop_id.to_string(), "tier": tier }
                }),
            },
        }
    }

    async fn store_with_shop(shop_id: Uuid) -> MemoryBillingStore {
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
    async fn redelivery_leaves_state_unchanged() {
        let shop_id = Uuid::new_v4();
        let store = store_with_shop(shop_id).await;
        let reconciler = Reconciler::new(store.clone());
        let event = checkout_event("evt_1", shop_id, "pro");

        let first = reconciler.handle_event(&event).await.unwrap();
        assert_eq!(first, WebhookOutcome::Processed);
        let after_first = store.shop_state(shop_id).await.unwrap();

        let second = reconciler.handle_event(&event).await.unwrap();
        assert_eq!(second, WebhookOutcome::AlreadyProcessed);
        let after_second = store.shop_state(shop_id).await.unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second.tier, "pro");
        assert_eq!(after_second.subscription_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn event_without_shop_metadata_mutates_nothing() {
        let shop_id = Uuid::new_v4();
        let store = store_with_shop(shop_id).await;
        let reconciler = Reconciler::new(store.clone());

        let event = BillingEvent {
            id: "evt_2".to_string(),
            event_type: "checkout.session.completed".to_string(),
            data: EventData {
                object: json!({ "id": "cs_1", "metadata": { "tier": "pro" } }),
            },
        };

        let outcome = reconciler.handle_event(&event).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);

        let state = store.shop_state(shop_id).await.unwrap();
        assert_eq!(state.tier, "free");
        // Ignored events are not ledgered, so a corrected replay could land
        assert!(!store.is_event_processed("evt_2").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_shop_is_ignored_not_ledgered() {
        let store = MemoryBillingStore::new();
        let reconciler = Reconciler::new(store.clone());
        let event = checkout_event("evt_3", Uuid::new_v4(), "studio");

        let outcome = reconciler.handle_event(&event).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(!store.is_event_processed("evt_3").await.unwrap());
    }

    #[tokio::test]
    async fn distinct_events_both_process() {
        let shop_id = Uuid::new_v4();
        let store = store_with_shop(shop_id).await;
        let reconciler = Reconciler::new(store.clone());

        let first = reconciler
            .handle_event(&checkout_event("evt_4", shop_id, "studio"))
            .await
            .unwrap();
        let second = reconciler
            .handle_event(&checkout_event("evt_5", shop_id, "pro"))
            .await
            .unwrap();

        assert_eq!(first, WebhookOutcome::Processed);
        assert_eq!(second, WebhookOutcome::Processed);
        assert_eq!(store.shop_state(shop_id).await.unwrap().tier, "pro");
    }
}
