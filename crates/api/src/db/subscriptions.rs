//! Subscription repository.
//!
//! Listing queries return [`SubscriptionDetails`]: the subscriptions are
//! fetched first, then their users and baskets in one query each.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use hoby_loop_core::{
    BasketId, Frequency, SubscriptionId, SubscriptionStatus, UserId,
};

use super::{BasketRepository, RepositoryError, UserRepository};
use crate::models::{Subscription, SubscriptionDetails};

macro_rules! subscription_columns {
    () => {
        "s.id, s.user_id, s.basket_id, s.frequency, s.status, s.created_at, s.updated_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: i32,
    user_id: i32,
    basket_id: i32,
    frequency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = RepositoryError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let frequency: Frequency = row.frequency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("subscription {}: {e}", row.id))
        })?;
        let status: SubscriptionStatus = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("subscription {}: {e}", row.id))
        })?;

        Ok(Self {
            id: SubscriptionId::new(row.id),
            user_id: UserId::new(row.user_id),
            basket_id: BasketId::new(row.basket_id),
            frequency,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a new subscription. New subscriptions always start `active`.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub basket_id: BasketId,
    pub frequency: Frequency,
}

/// Repository for subscription database operations.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a subscription by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored enum is invalid.
    pub async fn get_by_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(concat!(
            "SELECT ",
            subscription_columns!(),
            " FROM subscriptions s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a subscription with its consumer and basket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid or
    /// the related rows are missing.
    #[instrument(skip(self))]
    pub async fn get_details(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionDetails>, RepositoryError> {
        let Some(subscription) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let mut details = self.attach_related(vec![subscription]).await?;
        Ok(details.pop())
    }

    /// List every subscription with its consumer and basket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn list_all(&self) -> Result<Vec<SubscriptionDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(concat!(
            "SELECT ",
            subscription_columns!(),
            " FROM subscriptions s ORDER BY s.id"
        ))
        .fetch_all(self.pool)
        .await?;

        self.load_details(rows).await
    }

    /// List subscriptions to any basket the seller offers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    #[instrument(skip(self))]
    pub async fn list_by_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<SubscriptionDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(concat!(
            "SELECT ",
            subscription_columns!(),
            " FROM subscriptions s JOIN baskets b ON b.id = s.basket_id ",
            "WHERE b.seller_id = $1 ORDER BY s.id"
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;

        self.load_details(rows).await
    }

    /// List a consumer's subscriptions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    #[instrument(skip(self))]
    pub async fn list_by_consumer(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubscriptionDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(concat!(
            "SELECT ",
            subscription_columns!(),
            " FROM subscriptions s WHERE s.user_id = $1 ORDER BY s.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.load_details(rows).await
    }

    /// Create a subscription in the `active` state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the user or basket does
    /// not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(
        skip(self, subscription),
        fields(user_id = %subscription.user_id, basket_id = %subscription.basket_id)
    )]
    pub async fn create(
        &self,
        subscription: &NewSubscription,
    ) -> Result<Subscription, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "INSERT INTO subscriptions AS s (user_id, basket_id, frequency, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING s.id, s.user_id, s.basket_id, s.frequency, s.status, s.created_at, s.updated_at",
        )
        .bind(subscription.user_id)
        .bind(subscription.basket_id)
        .bind(subscription.frequency.as_str())
        .bind(SubscriptionStatus::Active.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "subscription"))?;

        row.try_into()
    }

    async fn load_details(
        &self,
        rows: Vec<SubscriptionRow>,
    ) -> Result<Vec<SubscriptionDetails>, RepositoryError> {
        let subscriptions = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Subscription>, _>>()?;
        self.attach_related(subscriptions).await
    }

    async fn attach_related(
        &self,
        subscriptions: Vec<Subscription>,
    ) -> Result<Vec<SubscriptionDetails>, RepositoryError> {
        if subscriptions.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<UserId> = subscriptions.iter().map(|s| s.user_id).collect();
        let basket_ids: Vec<BasketId> = subscriptions.iter().map(|s| s.basket_id).collect();

        let users: HashMap<_, _> = UserRepository::new(self.pool)
            .get_many(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let baskets: HashMap<_, _> = BasketRepository::new(self.pool)
            .get_many(&basket_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        subscriptions
            .into_iter()
            .map(|subscription| {
                let user = users.get(&subscription.user_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "subscription {} references missing user {}",
                        subscription.id, subscription.user_id
                    ))
                })?;
                let basket = baskets.get(&subscription.basket_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "subscription {} references missing basket {}",
                        subscription.id, subscription.basket_id
                    ))
                })?;
                Ok(SubscriptionDetails {
                    subscription,
                    user,
                    basket,
                })
            })
            .collect()
    }
}
