//! Delivery order domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hoby_loop_core::{OrderId, OrderStatus, SubscriptionId};

/// One delivery issued against a subscription.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub subscription_id: SubscriptionId,
    pub status: OrderStatus,
    /// Carrier tracking code, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
    /// First time the order moved to `shipped`.
    pub shipped_at: Option<DateTime<Utc>>,
    /// First time the order moved to `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
