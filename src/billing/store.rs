//! Persistence seam for webhook reconciliation: the processed-event ledger
//! and the shop subscription fields.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::events::SubscriptionUpdate;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Whether an update found its shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    UnknownShop,
}

/// Storage behind the reconciler: event ledger plus shop subscription fields.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Check if an event id has already been processed
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError>;

    /// Record an event id in the ledger
    async fn mark_event_processed(&self, event_id: &str) -> Result<(), StoreError>;

    /// Set the shop's subscription fields from a mapped update
    async fn apply_update(&self, update: &SubscriptionUpdate) -> Result<ApplyResult, StoreError>;
}

/// Postgres-backed store used by the server.
#[derive(Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM billing_events WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    async fn mark_event_processed(&self, event_id: &str) -> Result<(), StoreError> {
        // ON CONFLICT collapses concurrent duplicate deliveries
        sqlx::query(
            "INSERT INTO billing_events (event_id) VALUES ($1) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_update(&self, update: &SubscriptionUpdate) -> Result<ApplyResult, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE shops SET
                subscription_tier = COALESCE($2, subscription_tier),
                subscription_status = $3,
                billing_customer_id = COALESCE($4, billing_customer_id),
                billing_subscription_id = COALESCE($5, billing_subscription_id),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(update.shop_id)
        .bind(update.tier.map(|t| t.as_str()))
        .bind(update.status.as_str())
        .bind(update.customer_id.as_deref())
        .bind(update.subscription_id.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(ApplyResult::UnknownShop)
        } else {
            Ok(ApplyResult::Applied)
        }
    }
}

/// Subscription fields held per shop by the in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopBillingState {
    pub tier: String,
    pub status: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

/// In-memory store for tests and local development.
#[derive(Clone, Default)]
pub struct MemoryBillingStore {
    shops: Arc<RwLock<HashMap<Uuid, ShopBillingState>>>,
    processed: Arc<RwLock<HashSet<String>>>,
}

impl MemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_shop(&self, shop_id: Uuid, state: ShopBillingState) {
        self.shops.write().await.insert(shop_id, state);
    }

    pub async fn shop_state(&self, shop_id: Uuid) -> Option<ShopBillingState> {
        self.shops.read().await.get(&shop_id).cloned()
    }
}

#[async_trait]
impl BillingStore for MemoryBillingStore {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.processed.read().await.contains(event_id))
    }

    async fn mark_event_processed(&self, event_id: &str) -> Result<(), StoreError> {
        self.processed.write().await.insert(event_id.to_string());
        Ok(())
    }

    async fn apply_update(&self, update: &SubscriptionUpdate) -> Result<ApplyResult, StoreError> {
        let mut shops = self.shops.write().await;
        let Some(state) = shops.get_mut(&update.shop_id) else {
            return Ok(ApplyResult::UnknownShop);
        };

        if let Some(tier) = update.tier {
            state.tier = tier.as_str().to_string();
        }
        state.status = update.status.as_str().to_string();
        if let Some(customer_id) = &update.customer_id {
            state.customer_id = Some(customer_id.clone());
        }
        if let Some(subscription_id) = &update.subscription_id {
            state.subscription_id = Some(subscription_id.clone());
        }

        Ok(ApplyResult::Applied)
    }
}
