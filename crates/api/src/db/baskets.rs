//! Basket repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use hoby_loop_core::{BasketId, Price, UserId};

use super::RepositoryError;
use crate::models::Basket;

macro_rules! basket_columns {
    () => {
        "id, seller_id, name, description, price, created_at, updated_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct BasketRow {
    id: i32,
    seller_id: i32,
    name: String,
    description: String,
    price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BasketRow> for Basket {
    type Error = RepositoryError;

    fn try_from(row: BasketRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for basket {}: {e}", row.id))
        })?;

        Ok(Self {
            id: BasketId::new(row.id),
            seller_id: UserId::new(row.seller_id),
            name: row.name,
            description: row.description,
            price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a new basket.
#[derive(Debug, Clone)]
pub struct NewBasket {
    pub seller_id: UserId,
    pub name: String,
    pub description: String,
    pub price: Price,
}

/// Repository for basket database operations.
pub struct BasketRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BasketRepository<'a> {
    /// Create a new basket repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a basket by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored price is invalid.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: BasketId) -> Result<Option<Basket>, RepositoryError> {
        let row = sqlx::query_as::<_, BasketRow>(concat!(
            "SELECT ",
            basket_columns!(),
            " FROM baskets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List every basket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn list_all(&self) -> Result<Vec<Basket>, RepositoryError> {
        let rows = sqlx::query_as::<_, BasketRow>(concat!(
            "SELECT ",
            basket_columns!(),
            " FROM baskets ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List the baskets a seller offers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    #[instrument(skip(self))]
    pub async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Basket>, RepositoryError> {
        let rows = sqlx::query_as::<_, BasketRow>(concat!(
            "SELECT ",
            basket_columns!(),
            " FROM baskets WHERE seller_id = $1 ORDER BY id"
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Load several baskets at once, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn get_many(&self, ids: &[BasketId]) -> Result<Vec<Basket>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(BasketId::as_i32).collect();
        let rows = sqlx::query_as::<_, BasketRow>(concat!(
            "SELECT ",
            basket_columns!(),
            " FROM baskets WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a basket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the seller does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, basket), fields(seller_id = %basket.seller_id))]
    pub async fn create(&self, basket: &NewBasket) -> Result<Basket, RepositoryError> {
        let row = sqlx::query_as::<_, BasketRow>(concat!(
            "INSERT INTO baskets (seller_id, name, description, price) ",
            "VALUES ($1, $2, $3, $4) RETURNING ",
            basket_columns!()
        ))
        .bind(basket.seller_id)
        .bind(&basket.name)
        .bind(&basket.description)
        .bind(basket.price)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "basket"))?;

        row.try_into()
    }
}
