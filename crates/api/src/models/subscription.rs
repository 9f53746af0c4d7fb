//! Subscription domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hoby_loop_core::{BasketId, Frequency, SubscriptionId, SubscriptionStatus, UserId};

use super::{Basket, User};

/// A consumer's recurring purchase of a basket.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// The subscribing consumer.
    pub user_id: UserId,
    pub basket_id: BasketId,
    pub frequency: Frequency,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscription joined with its consumer and basket.
///
/// Seller and consumer dashboards list these, so the related rows are
/// loaded up front instead of one request per subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetails {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub user: User,
    pub basket: Basket,
}
