//! Billing webhook reconciliation.
//!
//! The billing provider owns the subscription ledger; this module keeps each
//! shop row's mirror of it current. Pipeline per delivery: verify signature,
//! parse, dedupe against the event ledger, map to a field-set, apply.

pub mod events;
pub mod reconcile;
pub mod store;
pub mod verification;

pub use events::{map_event, BillingEvent, MappedEvent, SubscriptionUpdate};
pub use reconcile::{Reconciler, WebhookOutcome};
pub use store::{ApplyResult, BillingStore, MemoryBillingStore, PgBillingStore, ShopBillingState, StoreError};
pub use verification::{VerificationError, WebhookVerifier};
