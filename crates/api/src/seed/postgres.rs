//! `PostgreSQL` seed store.
//!
//! Each insert runs inside a savepoint: a rejected explicit ID (or any other
//! constraint violation) rolls back to the savepoint instead of aborting the
//! outer transaction, so the seeder can retry with a store-assigned ID.

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use tracing::debug;

use hoby_loop_core::{BasketId, Email, SubscriptionId, UserId};

use super::batch::{SeedBasket, SeedSubscription, SeedUser};
use super::store::{SeedStore, SeedTable, SeedTransaction};
use crate::db::RepositoryError;

type IdQuery<'q> = QueryScalar<'q, Postgres, i32, PgArguments>;

// `$1` is the explicit ID. When it is NULL the row takes the next sequence
// value, bumped past any explicitly written ID still ahead of the sequence.
const INSERT_USER: &str = "\
    INSERT INTO users (id, email, password, role, name, cnpj, cpf, is_active, permissions, \
                       address_street, address_number, address_city, address_state, address_zip) \
    VALUES (COALESCE($1, (SELECT GREATEST(nextval(pg_get_serial_sequence('users', 'id')), \
                                          COALESCE(MAX(id), 0) + 1)::INTEGER FROM users)), \
            $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
    RETURNING id";

const UPDATE_USER: &str = "\
    UPDATE users SET email = $2, password = $3, role = $4, name = $5, cnpj = $6, cpf = $7, \
                     is_active = $8, permissions = $9, address_street = $10, \
                     address_number = $11, address_city = $12, address_state = $13, \
                     address_zip = $14, updated_at = NOW() \
    WHERE id = $1";

const INSERT_BASKET: &str = "\
    INSERT INTO baskets (id, seller_id, name, description, price) \
    VALUES (COALESCE($1, (SELECT GREATEST(nextval(pg_get_serial_sequence('baskets', 'id')), \
                                          COALESCE(MAX(id), 0) + 1)::INTEGER FROM baskets)), \
            $2, $3, $4, $5) \
    RETURNING id";

const UPDATE_BASKET: &str = "\
    UPDATE baskets SET seller_id = $2, name = $3, description = $4, price = $5, \
                       updated_at = NOW() \
    WHERE id = $1";

const INSERT_SUBSCRIPTION: &str = "\
    INSERT INTO subscriptions (id, user_id, basket_id, frequency, status) \
    VALUES (COALESCE($1, (SELECT GREATEST(nextval(pg_get_serial_sequence('subscriptions', 'id')), \
                                          COALESCE(MAX(id), 0) + 1)::INTEGER FROM subscriptions)), \
            $2, $3, $4, $5) \
    RETURNING id";

const UPDATE_SUBSCRIPTION: &str = "\
    UPDATE subscriptions SET user_id = $2, basket_id = $3, frequency = $4, status = $5, \
                             updated_at = NOW() \
    WHERE id = $1";

/// Seed store over a `PostgreSQL` pool.
pub struct PgSeedStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSeedStore<'a> {
    /// Create a seed store on an existing pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeedStore for PgSeedStore<'_> {
    type Transaction = PgSeedTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgSeedTransaction { tx })
    }

    async fn reset_sequence(&self, table: SeedTable) -> Result<(), RepositoryError> {
        let table = table.as_str();
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE(MAX(id) + 1, 1), false) FROM {table}"
        );
        sqlx::query(&sql).execute(self.pool).await?;
        debug!(table, "Reset ID sequence");
        Ok(())
    }
}

/// Open seeding transaction on `PostgreSQL`.
pub struct PgSeedTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgSeedTransaction {
    /// Run an `INSERT ... RETURNING id` inside a savepoint.
    async fn insert_returning_id(
        &mut self,
        query: IdQuery<'_>,
        what: &str,
    ) -> Result<i32, RepositoryError> {
        let mut savepoint = (&mut self.tx).begin().await?;
        match query.fetch_one(&mut *savepoint).await {
            Ok(id) => {
                savepoint.commit().await?;
                Ok(id)
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(RepositoryError::from_write(e, what))
            }
        }
    }

    async fn find_id(
        &mut self,
        sql: &'static str,
        id: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        Ok(sqlx::query_scalar::<_, i32>(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }
}

#[async_trait]
impl SeedTransaction for PgSeedTransaction {
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<UserId>, RepositoryError> {
        let found = self
            .find_id("SELECT id FROM users WHERE id = $1", id.as_i32())
            .await?;
        Ok(found.map(UserId::new))
    }

    async fn find_user_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<UserId>, RepositoryError> {
        let found = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(found.map(UserId::new))
    }

    async fn find_basket(&mut self, id: BasketId) -> Result<Option<BasketId>, RepositoryError> {
        let found = self
            .find_id("SELECT id FROM baskets WHERE id = $1", id.as_i32())
            .await?;
        Ok(found.map(BasketId::new))
    }

    async fn find_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionId>, RepositoryError> {
        let found = self
            .find_id("SELECT id FROM subscriptions WHERE id = $1", id.as_i32())
            .await?;
        Ok(found.map(SubscriptionId::new))
    }

    async fn insert_user(
        &mut self,
        id: Option<UserId>,
        user: &SeedUser,
    ) -> Result<UserId, RepositoryError> {
        let query = sqlx::query_scalar(INSERT_USER)
            .bind(id)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.role.as_str())
            .bind(&user.name)
            .bind(&user.cnpj)
            .bind(&user.cpf)
            .bind(user.is_active)
            .bind(&user.permissions)
            .bind(&user.address.street)
            .bind(&user.address.number)
            .bind(&user.address.city)
            .bind(&user.address.state)
            .bind(&user.address.zip_code);
        self.insert_returning_id(query, "user").await.map(UserId::new)
    }

    async fn update_user(&mut self, id: UserId, user: &SeedUser) -> Result<(), RepositoryError> {
        sqlx::query(UPDATE_USER)
            .bind(id)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.role.as_str())
            .bind(&user.name)
            .bind(&user.cnpj)
            .bind(&user.cpf)
            .bind(user.is_active)
            .bind(&user.permissions)
            .bind(&user.address.street)
            .bind(&user.address.number)
            .bind(&user.address.city)
            .bind(&user.address.state)
            .bind(&user.address.zip_code)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "user"))?;
        Ok(())
    }

    async fn insert_basket(
        &mut self,
        id: Option<BasketId>,
        basket: &SeedBasket,
    ) -> Result<BasketId, RepositoryError> {
        let query = sqlx::query_scalar(INSERT_BASKET)
            .bind(id)
            .bind(basket.seller_id)
            .bind(&basket.name)
            .bind(&basket.description)
            .bind(basket.price);
        self.insert_returning_id(query, "basket")
            .await
            .map(BasketId::new)
    }

    async fn update_basket(
        &mut self,
        id: BasketId,
        basket: &SeedBasket,
    ) -> Result<(), RepositoryError> {
        sqlx::query(UPDATE_BASKET)
            .bind(id)
            .bind(basket.seller_id)
            .bind(&basket.name)
            .bind(&basket.description)
            .bind(basket.price)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "basket"))?;
        Ok(())
    }

    async fn insert_subscription(
        &mut self,
        id: Option<SubscriptionId>,
        subscription: &SeedSubscription,
    ) -> Result<SubscriptionId, RepositoryError> {
        let query = sqlx::query_scalar(INSERT_SUBSCRIPTION)
            .bind(id)
            .bind(subscription.user_id)
            .bind(subscription.basket_id)
            .bind(subscription.frequency.as_str())
            .bind(subscription.status.as_str());
        self.insert_returning_id(query, "subscription")
            .await
            .map(SubscriptionId::new)
    }

    async fn update_subscription(
        &mut self,
        id: SubscriptionId,
        subscription: &SeedSubscription,
    ) -> Result<(), RepositoryError> {
        sqlx::query(UPDATE_SUBSCRIPTION)
            .bind(id)
            .bind(subscription.user_id)
            .bind(subscription.basket_id)
            .bind(subscription.frequency.as_str())
            .bind(subscription.status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "subscription"))?;
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
