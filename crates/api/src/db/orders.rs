//! Delivery order repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use hoby_loop_core::{BasketId, OrderId, OrderStatus, SubscriptionId};

use super::RepositoryError;
use crate::models::Order;

macro_rules! order_columns {
    () => {
        "o.id, o.subscription_id, o.status, o.tracking_code, o.shipped_at, o.delivered_at, \
         o.created_at, o.updated_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    subscription_id: i32,
    status: String,
    tracking_code: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", row.id)))?;

        Ok(Self {
            id: OrderId::new(row.id),
            subscription_id: SubscriptionId::new(row.subscription_id),
            status,
            tracking_code: row.tracking_code,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored status is invalid.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Orders for one subscription, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    #[instrument(skip(self))]
    pub async fn list_by_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders o WHERE o.subscription_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(subscription_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Orders across every subscription to a basket, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    #[instrument(skip(self))]
    pub async fn list_by_basket(&self, basket_id: BasketId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders o JOIN subscriptions s ON s.id = o.subscription_id ",
            "WHERE s.basket_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(basket_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the subscription does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        subscription_id: SubscriptionId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "INSERT INTO orders AS o (subscription_id, status) VALUES ($1, $2) RETURNING ",
            order_columns!()
        ))
        .bind(subscription_id)
        .bind(status.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order"))?;

        row.try_into()
    }

    /// Move an order to a new status.
    ///
    /// A tracking code, when given, replaces the stored one. `shipped_at` and
    /// `delivered_at` are stamped the first time the order reaches that
    /// status and never overwritten afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, tracking_code))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_code: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "UPDATE orders AS o SET ",
            "status = $2, ",
            "tracking_code = COALESCE($3, o.tracking_code), ",
            "shipped_at = CASE WHEN $2 = 'shipped' AND o.shipped_at IS NULL ",
            "THEN NOW() ELSE o.shipped_at END, ",
            "delivered_at = CASE WHEN $2 = 'delivered' AND o.delivered_at IS NULL ",
            "THEN NOW() ELSE o.delivered_at END, ",
            "updated_at = NOW() ",
            "WHERE o.id = $1 RETURNING ",
            order_columns!()
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(tracking_code)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}
