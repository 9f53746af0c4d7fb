//! Idempotent reconciling seeder.
//!
//! Applies a [`SeedBatch`] of users, baskets and subscriptions to a store so
//! that running the same batch again converges on the same rows instead of
//! duplicating them.
//!
//! ## Identity Resolution
//!
//! Users are matched by ID, then by email:
//!
//! 1. A stored user with the record's ID is updated in place.
//! 2. Otherwise a stored user with the record's email is updated in place
//!    and keeps its stored ID. The record's ID is discarded.
//! 3. Otherwise the user is inserted under the record's ID. If that insert
//!    fails, it is retried once with a store-assigned ID.
//!
//! Baskets and subscriptions follow the same shape without the email step.
//!
//! When a record ends up under a different ID than the batch gave it, later
//! references in the same batch (`seller_id`, `user_id`, `basket_id`) are
//! rewritten to the stored ID. That mapping lives only for the run.
//!
//! ## Transactions
//!
//! The whole batch is one transaction: any store error rolls back every
//! write. Once committed, each table's ID sequence is moved past the highest
//! stored ID. A failed sequence reset is logged and reported as a warning;
//! it never fails the run.

mod batch;
mod error;
#[cfg(any(test, feature = "test-support"))]
mod memory;
mod postgres;
mod store;

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

pub use batch::{
    SeedBasket, SeedBatch, SeedSubscription, SeedUser, lint_batch, load_batch, validate_batch,
};
pub use error::SeedError;
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemorySeedStore, MemorySeedTransaction};
pub use postgres::{PgSeedStore, PgSeedTransaction};
pub use store::{SeedStore, SeedTable, SeedTransaction};

use hoby_loop_core::{BasketId, SubscriptionId, UserId};

/// Per-table outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Rows created.
    pub inserted: u32,
    /// Existing rows overwritten.
    pub updated: u32,
    /// Of `updated`, users found by email rather than ID.
    pub matched_by_email: u32,
    /// Of `inserted`, rows stored under a store-assigned ID.
    pub reassigned: u32,
}

/// Result of a successful seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Outcomes for the `users` collection.
    pub users: EntityCounts,
    /// Outcomes for the `baskets` collection.
    pub baskets: EntityCounts,
    /// Outcomes for the `subscriptions` collection.
    pub subscriptions: EntityCounts,
    /// Lint findings and failed sequence resets.
    pub warnings: Vec<String>,
}

/// Load a batch file and seed it.
///
/// # Errors
///
/// See [`load_batch`] and [`seed_batch`].
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn seed_from_file<S: SeedStore>(
    store: &S,
    path: impl AsRef<Path>,
) -> Result<SeedReport, SeedError> {
    let batch = load_batch(path).await?;
    seed_batch(store, &batch).await
}

/// Reconcile a batch into the store in a single transaction.
///
/// # Errors
///
/// Returns `SeedError::Invalid` if [`validate_batch`] finds problems (nothing
/// is written), and any store error as `SeedError::Record` or
/// `SeedError::Store` after rolling the transaction back.
#[instrument(skip_all, fields(records = batch.len()))]
pub async fn seed_batch<S: SeedStore>(
    store: &S,
    batch: &SeedBatch,
) -> Result<SeedReport, SeedError> {
    let problems = validate_batch(batch);
    if !problems.is_empty() {
        return Err(SeedError::Invalid(problems));
    }

    let mut report = SeedReport::default();
    for warning in lint_batch(batch) {
        warn!(%warning, "Seed record looks wrong");
        report.warnings.push(warning);
    }

    let mut tx = store.begin().await?;
    if let Err(e) = apply(&mut tx, batch, &mut report).await {
        if let Err(rollback_err) = tx.rollback().await {
            warn!(error = %rollback_err, "Rollback after failed seed also failed");
        }
        return Err(e);
    }
    tx.commit().await?;

    info!(
        users_inserted = report.users.inserted,
        users_updated = report.users.updated,
        users_matched_by_email = report.users.matched_by_email,
        baskets_inserted = report.baskets.inserted,
        baskets_updated = report.baskets.updated,
        subscriptions_inserted = report.subscriptions.inserted,
        subscriptions_updated = report.subscriptions.updated,
        "Seed batch committed"
    );

    for table in SeedTable::ALL {
        if let Err(e) = store.reset_sequence(table).await {
            warn!(table = table.as_str(), error = %e, "Failed to reset ID sequence");
            report
                .warnings
                .push(format!("failed to reset {} sequence: {e}", table.as_str()));
        }
    }

    Ok(report)
}

/// Batch ID to stored ID, for one table.
struct Identities<I> {
    entity: &'static str,
    stored: HashMap<I, I>,
    written: HashSet<I>,
}

impl<I> Identities<I>
where
    I: Copy + Eq + Hash + Into<i32>,
{
    fn new(entity: &'static str) -> Self {
        Self {
            entity,
            stored: HashMap::new(),
            written: HashSet::new(),
        }
    }

    /// The stored ID for a batch reference. IDs outside the batch pass through.
    fn resolve(&self, batch_id: I) -> I {
        self.stored.get(&batch_id).copied().unwrap_or(batch_id)
    }

    /// Remember where a record landed. Each stored row takes one record.
    fn record(&mut self, batch_id: I, stored_id: I) -> Result<(), SeedError> {
        if !self.written.insert(stored_id) {
            return Err(SeedError::IdentityClash {
                entity: self.entity,
                batch_id: batch_id.into(),
                stored_id: stored_id.into(),
            });
        }
        self.stored.insert(batch_id, stored_id);
        Ok(())
    }
}

async fn apply<T: SeedTransaction>(
    tx: &mut T,
    batch: &SeedBatch,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    let mut users = Identities::<UserId>::new("user");
    for user in &batch.users {
        let stored = seed_user(tx, user, &mut report.users).await?;
        users.record(user.id, stored)?;
    }

    let mut baskets = Identities::<BasketId>::new("basket");
    for basket in &batch.baskets {
        let resolved = SeedBasket {
            seller_id: users.resolve(basket.seller_id),
            ..basket.clone()
        };
        let stored = seed_basket(tx, &resolved, &mut report.baskets).await?;
        baskets.record(basket.id, stored)?;
    }

    let mut subscriptions = Identities::<SubscriptionId>::new("subscription");
    for subscription in &batch.subscriptions {
        let resolved = SeedSubscription {
            user_id: users.resolve(subscription.user_id),
            basket_id: baskets.resolve(subscription.basket_id),
            ..subscription.clone()
        };
        let stored = seed_subscription(tx, &resolved, &mut report.subscriptions).await?;
        subscriptions.record(subscription.id, stored)?;
    }

    Ok(())
}

async fn seed_user<T: SeedTransaction>(
    tx: &mut T,
    user: &SeedUser,
    counts: &mut EntityCounts,
) -> Result<UserId, SeedError> {
    let label = || format!("user {} <{}>", user.id, user.email);

    if let Some(id) = tx
        .find_user_by_id(user.id)
        .await
        .map_err(SeedError::record(label()))?
    {
        tx.update_user(id, user)
            .await
            .map_err(SeedError::record(label()))?;
        counts.updated += 1;
        debug!(id = %id, "Updated user by id");
        return Ok(id);
    }

    if let Some(id) = tx
        .find_user_by_email(&user.email)
        .await
        .map_err(SeedError::record(label()))?
    {
        tx.update_user(id, user)
            .await
            .map_err(SeedError::record(label()))?;
        counts.updated += 1;
        counts.matched_by_email += 1;
        info!(
            batch_id = %user.id,
            stored_id = %id,
            email = %user.email,
            "Matched user by email, keeping stored id"
        );
        return Ok(id);
    }

    match tx.insert_user(Some(user.id), user).await {
        Ok(id) => {
            counts.inserted += 1;
            debug!(id = %id, "Inserted user");
            Ok(id)
        }
        Err(first) => {
            warn!(
                batch_id = %user.id,
                error = %first,
                "User id rejected, retrying with a store-assigned id"
            );
            let id = tx
                .insert_user(None, user)
                .await
                .map_err(SeedError::record(label()))?;
            counts.inserted += 1;
            counts.reassigned += 1;
            info!(batch_id = %user.id, stored_id = %id, "Inserted user under a new id");
            Ok(id)
        }
    }
}

async fn seed_basket<T: SeedTransaction>(
    tx: &mut T,
    basket: &SeedBasket,
    counts: &mut EntityCounts,
) -> Result<BasketId, SeedError> {
    let label = || format!("basket {} ({})", basket.id, basket.name);

    if let Some(id) = tx
        .find_basket(basket.id)
        .await
        .map_err(SeedError::record(label()))?
    {
        tx.update_basket(id, basket)
            .await
            .map_err(SeedError::record(label()))?;
        counts.updated += 1;
        debug!(id = %id, "Updated basket");
        return Ok(id);
    }

    match tx.insert_basket(Some(basket.id), basket).await {
        Ok(id) => {
            counts.inserted += 1;
            debug!(id = %id, "Inserted basket");
            Ok(id)
        }
        Err(first) => {
            warn!(
                batch_id = %basket.id,
                error = %first,
                "Basket id rejected, retrying with a store-assigned id"
            );
            let id = tx
                .insert_basket(None, basket)
                .await
                .map_err(SeedError::record(label()))?;
            counts.inserted += 1;
            counts.reassigned += 1;
            info!(batch_id = %basket.id, stored_id = %id, "Inserted basket under a new id");
            Ok(id)
        }
    }
}

async fn seed_subscription<T: SeedTransaction>(
    tx: &mut T,
    subscription: &SeedSubscription,
    counts: &mut EntityCounts,
) -> Result<SubscriptionId, SeedError> {
    let label = || format!("subscription {}", subscription.id);

    if let Some(id) = tx
        .find_subscription(subscription.id)
        .await
        .map_err(SeedError::record(label()))?
    {
        tx.update_subscription(id, subscription)
            .await
            .map_err(SeedError::record(label()))?;
        counts.updated += 1;
        debug!(id = %id, "Updated subscription");
        return Ok(id);
    }

    match tx
        .insert_subscription(Some(subscription.id), subscription)
        .await
    {
        Ok(id) => {
            counts.inserted += 1;
            debug!(id = %id, "Inserted subscription");
            Ok(id)
        }
        Err(first) => {
            warn!(
                batch_id = %subscription.id,
                error = %first,
                "Subscription id rejected, retrying with a store-assigned id"
            );
            let id = tx
                .insert_subscription(None, subscription)
                .await
                .map_err(SeedError::record(label()))?;
            counts.inserted += 1;
            counts.reassigned += 1;
            info!(
                batch_id = %subscription.id,
                stored_id = %id,
                "Inserted subscription under a new id"
            );
            Ok(id)
        }
    }
}
