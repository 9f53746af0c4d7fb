//! In-memory seed store for tests.
//!
//! Mirrors the `PostgreSQL` schema closely enough to exercise the seeder:
//! primary keys and `users.email` are unique, baskets and subscriptions must
//! reference existing rows, and each table has an ID sequence that only
//! advances on store-assigned inserts.
//!
//! A transaction works on a copy of the tables and holds the store lock
//! until it commits or is dropped, so transactions never interleave.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use hoby_loop_core::{BasketId, Email, SubscriptionId, UserId};

use super::batch::{SeedBasket, SeedSubscription, SeedUser};
use super::store::{SeedStore, SeedTable, SeedTransaction};
use crate::db::RepositoryError;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, SeedUser>,
    baskets: BTreeMap<BasketId, SeedBasket>,
    subscriptions: BTreeMap<SubscriptionId, SeedSubscription>,
    /// Next sequence value per table. Missing means 1.
    sequences: HashMap<SeedTable, i32>,
    /// IDs that reject inserts without being visible to lookups.
    reserved: HashSet<(SeedTable, i32)>,
    failing_resets: HashSet<SeedTable>,
    failing_lookups: HashSet<SeedTable>,
}

impl Tables {
    fn max_id(&self, table: SeedTable) -> Option<i32> {
        match table {
            SeedTable::Users => self.users.keys().next_back().map(UserId::as_i32),
            SeedTable::Baskets => self.baskets.keys().next_back().map(BasketId::as_i32),
            SeedTable::Subscriptions => self
                .subscriptions
                .keys()
                .next_back()
                .map(SubscriptionId::as_i32),
        }
    }

    fn contains(&self, table: SeedTable, id: i32) -> bool {
        match table {
            SeedTable::Users => self.users.contains_key(&UserId::new(id)),
            SeedTable::Baskets => self.baskets.contains_key(&BasketId::new(id)),
            SeedTable::Subscriptions => self.subscriptions.contains_key(&SubscriptionId::new(id)),
        }
    }

    fn check_lookup(&self, table: SeedTable) -> Result<(), RepositoryError> {
        if self.failing_lookups.contains(&table) {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "canceling statement due to statement timeout on {}",
                table.as_str()
            ))));
        }
        Ok(())
    }

    fn next_value(&self, table: SeedTable) -> i32 {
        self.sequences.get(&table).copied().unwrap_or(1)
    }

    /// Pick the row's ID and check the primary key is free.
    ///
    /// Store-assigned IDs skip past every stored ID, like the `PostgreSQL`
    /// adapter's fallback insert.
    fn claim_id(
        &mut self,
        table: SeedTable,
        explicit: Option<i32>,
    ) -> Result<i32, RepositoryError> {
        let id = match explicit {
            Some(id) => id,
            None => {
                let above_rows = self.max_id(table).map_or(1, |max| max + 1);
                let id = self.next_value(table).max(above_rows);
                self.sequences.insert(table, id + 1);
                id
            }
        };

        if self.contains(table, id) || self.reserved.contains(&(table, id)) {
            return Err(RepositoryError::Conflict(format!(
                "{} violates {}_pkey",
                table.as_str(),
                table.as_str()
            )));
        }
        Ok(id)
    }

    fn check_email(&self, email: &Email, owner: Option<UserId>) -> Result<(), RepositoryError> {
        let taken = self
            .users
            .values()
            .any(|u| &u.email == email && Some(u.id) != owner);
        if taken {
            return Err(RepositoryError::Conflict(
                "user violates users_email_key".to_owned(),
            ));
        }
        Ok(())
    }

    fn check_user(&self, id: UserId, constraint: &str) -> Result<(), RepositoryError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::MissingReference(format!(
                "user {id} does not exist ({constraint})"
            )))
        }
    }

    fn check_basket(&self, id: BasketId) -> Result<(), RepositoryError> {
        if self.baskets.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::MissingReference(format!(
                "basket {id} does not exist (subscriptions_basket_id_fkey)"
            )))
        }
    }
}

/// Seed store backed by in-process tables.
#[derive(Debug, Clone, Default)]
pub struct MemorySeedStore {
    state: Arc<Mutex<Tables>>,
}

impl MemorySeedStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inserts under `id` fail even though lookups do not find a row.
    pub async fn reserve_id(&self, table: SeedTable, id: i32) {
        self.state.lock().await.reserved.insert((table, id));
    }

    /// Make every [`SeedStore::reset_sequence`] call for `table` fail.
    pub async fn fail_sequence_reset(&self, table: SeedTable) {
        self.state.lock().await.failing_resets.insert(table);
    }

    /// Make every lookup against `table` fail with a database error.
    pub async fn fail_lookup(&self, table: SeedTable) {
        self.state.lock().await.failing_lookups.insert(table);
    }

    /// The ID a plain insert into `table` would draw from its sequence.
    pub async fn next_sequence_value(&self, table: SeedTable) -> i32 {
        self.state.lock().await.next_value(table)
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    pub async fn basket_count(&self) -> usize {
        self.state.lock().await.baskets.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.lock().await.subscriptions.len()
    }

    /// A stored user, with `id` set to its stored ID.
    pub async fn user(&self, id: UserId) -> Option<SeedUser> {
        self.state.lock().await.users.get(&id).cloned()
    }

    pub async fn user_by_email(&self, email: &str) -> Option<SeedUser> {
        self.state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email.as_str() == email)
            .cloned()
    }

    pub async fn basket(&self, id: BasketId) -> Option<SeedBasket> {
        self.state.lock().await.baskets.get(&id).cloned()
    }

    pub async fn subscription(&self, id: SubscriptionId) -> Option<SeedSubscription> {
        self.state.lock().await.subscriptions.get(&id).cloned()
    }
}

#[async_trait]
impl SeedStore for MemorySeedStore {
    type Transaction = MemorySeedTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemorySeedTransaction { guard, working })
    }

    async fn reset_sequence(&self, table: SeedTable) -> Result<(), RepositoryError> {
        let mut tables = self.state.lock().await;
        if tables.failing_resets.contains(&table) {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "permission denied for sequence {}_id_seq",
                table.as_str()
            ))));
        }
        let next = tables.max_id(table).map_or(1, |max| max + 1);
        tables.sequences.insert(table, next);
        Ok(())
    }
}

/// Open transaction on a [`MemorySeedStore`].
#[derive(Debug)]
pub struct MemorySeedTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl SeedTransaction for MemorySeedTransaction {
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<UserId>, RepositoryError> {
        self.working.check_lookup(SeedTable::Users)?;
        Ok(self.working.users.contains_key(&id).then_some(id))
    }

    async fn find_user_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<UserId>, RepositoryError> {
        self.working.check_lookup(SeedTable::Users)?;
        Ok(self
            .working
            .users
            .values()
            .find(|u| &u.email == email)
            .map(|u| u.id))
    }

    async fn find_basket(&mut self, id: BasketId) -> Result<Option<BasketId>, RepositoryError> {
        self.working.check_lookup(SeedTable::Baskets)?;
        Ok(self.working.baskets.contains_key(&id).then_some(id))
    }

    async fn find_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionId>, RepositoryError> {
        self.working.check_lookup(SeedTable::Subscriptions)?;
        Ok(self.working.subscriptions.contains_key(&id).then_some(id))
    }

    async fn insert_user(
        &mut self,
        id: Option<UserId>,
        user: &SeedUser,
    ) -> Result<UserId, RepositoryError> {
        self.working.check_email(&user.email, None)?;
        let id = UserId::new(
            self.working
                .claim_id(SeedTable::Users, id.map(|id| id.as_i32()))?,
        );
        self.working.users.insert(
            id,
            SeedUser {
                id,
                ..user.clone()
            },
        );
        Ok(id)
    }

    async fn update_user(&mut self, id: UserId, user: &SeedUser) -> Result<(), RepositoryError> {
        self.working.check_email(&user.email, Some(id))?;
        let row = self
            .working
            .users
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        *row = SeedUser {
            id,
            ..user.clone()
        };
        Ok(())
    }

    async fn insert_basket(
        &mut self,
        id: Option<BasketId>,
        basket: &SeedBasket,
    ) -> Result<BasketId, RepositoryError> {
        self.working
            .check_user(basket.seller_id, "baskets_seller_id_fkey")?;
        let id = BasketId::new(
            self.working
                .claim_id(SeedTable::Baskets, id.map(|id| id.as_i32()))?,
        );
        self.working.baskets.insert(
            id,
            SeedBasket {
                id,
                ..basket.clone()
            },
        );
        Ok(id)
    }

    async fn update_basket(
        &mut self,
        id: BasketId,
        basket: &SeedBasket,
    ) -> Result<(), RepositoryError> {
        self.working
            .check_user(basket.seller_id, "baskets_seller_id_fkey")?;
        let row = self
            .working
            .baskets
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        *row = SeedBasket {
            id,
            ..basket.clone()
        };
        Ok(())
    }

    async fn insert_subscription(
        &mut self,
        id: Option<SubscriptionId>,
        subscription: &SeedSubscription,
    ) -> Result<SubscriptionId, RepositoryError> {
        self.working
            .check_user(subscription.user_id, "subscriptions_user_id_fkey")?;
        self.working.check_basket(subscription.basket_id)?;
        let id = SubscriptionId::new(
            self.working
                .claim_id(SeedTable::Subscriptions, id.map(|id| id.as_i32()))?,
        );
        self.working.subscriptions.insert(
            id,
            SeedSubscription {
                id,
                ..subscription.clone()
            },
        );
        Ok(id)
    }

    async fn update_subscription(
        &mut self,
        id: SubscriptionId,
        subscription: &SeedSubscription,
    ) -> Result<(), RepositoryError> {
        self.working
            .check_user(subscription.user_id, "subscriptions_user_id_fkey")?;
        self.working.check_basket(subscription.basket_id)?;
        let row = self
            .working
            .subscriptions
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        *row = SeedSubscription {
            id,
            ..subscription.clone()
        };
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
