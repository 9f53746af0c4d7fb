//! Persistence ports used by the seeder.
//!
//! The seeder only sees these two traits. [`super::PgSeedStore`] implements
//! them over a `PostgreSQL` pool; the in-memory store used by tests enforces
//! the same unique and foreign-key constraints.

use async_trait::async_trait;

use hoby_loop_core::{BasketId, Email, SubscriptionId, UserId};

use super::batch::{SeedBasket, SeedSubscription, SeedUser};
use crate::db::RepositoryError;

/// A table the seeder writes with explicit IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedTable {
    Users,
    Baskets,
    Subscriptions,
}

impl SeedTable {
    /// Every seeded table, in write order.
    pub const ALL: [Self; 3] = [Self::Users, Self::Baskets, Self::Subscriptions];

    /// Table name in the schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Baskets => "baskets",
            Self::Subscriptions => "subscriptions",
        }
    }
}

/// A store the seeder can open transactions on.
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Transaction handle returned by [`SeedStore::begin`].
    type Transaction: SeedTransaction;

    /// Open a transaction covering the whole batch.
    async fn begin(&self) -> Result<Self::Transaction, RepositoryError>;

    /// Move the table's ID sequence past every stored ID, so the next
    /// store-assigned ID is `MAX(id) + 1` (or 1 on an empty table).
    async fn reset_sequence(&self, table: SeedTable) -> Result<(), RepositoryError>;
}

/// One open seeding transaction.
///
/// Lookups return the stored row's ID when it exists. Writes take the
/// record with its references already resolved; the record's own `id` field
/// is ignored in favour of the explicit `id` argument.
#[async_trait]
pub trait SeedTransaction: Send {
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<UserId>, RepositoryError>;

    async fn find_user_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<UserId>, RepositoryError>;

    async fn find_basket(&mut self, id: BasketId) -> Result<Option<BasketId>, RepositoryError>;

    async fn find_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionId>, RepositoryError>;

    /// Insert a user under `id`, or under a store-assigned ID when `None`.
    ///
    /// A failed insert must leave the transaction usable.
    async fn insert_user(
        &mut self,
        id: Option<UserId>,
        user: &SeedUser,
    ) -> Result<UserId, RepositoryError>;

    /// Overwrite every mutable column of an existing user.
    async fn update_user(&mut self, id: UserId, user: &SeedUser) -> Result<(), RepositoryError>;

    /// Insert a basket under `id`, or under a store-assigned ID when `None`.
    async fn insert_basket(
        &mut self,
        id: Option<BasketId>,
        basket: &SeedBasket,
    ) -> Result<BasketId, RepositoryError>;

    async fn update_basket(
        &mut self,
        id: BasketId,
        basket: &SeedBasket,
    ) -> Result<(), RepositoryError>;

    /// Insert a subscription under `id`, or under a store-assigned ID when `None`.
    async fn insert_subscription(
        &mut self,
        id: Option<SubscriptionId>,
        subscription: &SeedSubscription,
    ) -> Result<SubscriptionId, RepositoryError>;

    async fn update_subscription(
        &mut self,
        id: SubscriptionId,
        subscription: &SeedSubscription,
    ) -> Result<(), RepositoryError>;

    /// Make every write visible.
    async fn commit(self) -> Result<(), RepositoryError>;

    /// Discard every write.
    async fn rollback(self) -> Result<(), RepositoryError>;
}
