//! Basket domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hoby_loop_core::{BasketId, Price, UserId};

/// A recurring product bundle offered by a seller.
#[derive(Debug, Clone, Serialize)]
pub struct Basket {
    pub id: BasketId,
    /// The seller who lists this basket.
    pub seller_id: UserId,
    pub name: String,
    pub description: String,
    /// Price per delivery in BRL.
    pub price: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
