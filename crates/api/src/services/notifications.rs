//! Order status notifications.
//!
//! Handlers hand an [`OrderNotification`] to the [`NotificationDispatcher`]
//! after the order is written and respond without waiting. A single worker
//! task drains the queue, resolves the consumer and basket, and delivers
//! through a [`NotificationSink`].
//!
//! Delivery is at-most-once and best-effort: a full or closed queue drops
//! the notification with a warning, and a failed lookup or sink call is
//! logged and skipped. Nothing orders a notification relative to the HTTP
//! response that queued it.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use hoby_loop_core::{OrderId, OrderStatus, SubscriptionId};

use crate::db::{RepositoryError, SubscriptionRepository};
use crate::models::SubscriptionDetails;

/// An order reached a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderNotification {
    pub order_id: OrderId,
    pub subscription_id: SubscriptionId,
    pub status: OrderStatus,
}

/// A resolved message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub order_id: OrderId,
    pub recipient_name: String,
    pub recipient_email: String,
    pub body: String,
}

impl NotificationMessage {
    fn from_details(notification: &OrderNotification, details: &SubscriptionDetails) -> Self {
        Self {
            order_id: notification.order_id,
            recipient_name: details.user.name.clone(),
            recipient_email: details.user.email.to_string(),
            body: format!(
                "Your '{}' is now {}!",
                details.basket.name, notification.status
            ),
        }
    }
}

/// Errors from delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] RepositoryError),

    #[error("subscription {0} no longer exists")]
    MissingSubscription(SubscriptionId),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Resolves a subscription to its consumer and basket.
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn subscription_details(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionDetails>, RepositoryError>;
}

#[async_trait]
impl SubscriptionLookup for PgPool {
    async fn subscription_details(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<SubscriptionDetails>, RepositoryError> {
        SubscriptionRepository::new(self).get_details(id).await
    }
}

/// Where resolved notifications go.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotificationError>;
}

/// Sink that writes each notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        info!(
            order_id = %message.order_id,
            to = %message.recipient_email,
            name = %message.recipient_name,
            message = %message.body,
            "Notification sent"
        );
        Ok(())
    }
}

/// Handle for queueing order notifications. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<OrderNotification>,
}

impl NotificationDispatcher {
    /// Create a dispatcher and the receiving end of its queue.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OrderNotification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create a dispatcher and spawn its worker.
    ///
    /// The worker stops once every dispatcher clone is dropped and the
    /// queue is drained.
    pub fn spawn<L, S>(capacity: usize, lookup: L, sink: S) -> (Self, JoinHandle<()>)
    where
        L: SubscriptionLookup + 'static,
        S: NotificationSink + 'static,
    {
        let (dispatcher, rx) = Self::channel(capacity);
        let handle = tokio::spawn(run_worker(rx, lookup, sink));
        (dispatcher, handle)
    }

    /// Queue a notification without waiting.
    ///
    /// Returns `false` if it was dropped.
    pub fn dispatch(&self, notification: OrderNotification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    order_id = %dropped.order_id,
                    status = %dropped.status,
                    "Order notification dropped: queue full"
                );
                false
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(
                    order_id = %dropped.order_id,
                    "Order notification dropped: worker stopped"
                );
                false
            }
        }
    }
}

/// Drain the queue until every sender is gone.
pub async fn run_worker<L, S>(mut rx: mpsc::Receiver<OrderNotification>, lookup: L, sink: S)
where
    L: SubscriptionLookup,
    S: NotificationSink,
{
    while let Some(notification) = rx.recv().await {
        if let Err(e) = deliver(&notification, &lookup, &sink).await {
            warn!(
                order_id = %notification.order_id,
                error = %e,
                "Order notification not delivered"
            );
        }
    }
    debug!("Notification worker stopped");
}

#[instrument(skip(lookup, sink), fields(order_id = %notification.order_id))]
async fn deliver<L, S>(
    notification: &OrderNotification,
    lookup: &L,
    sink: &S,
) -> Result<(), NotificationError>
where
    L: SubscriptionLookup,
    S: NotificationSink,
{
    let details = lookup
        .subscription_details(notification.subscription_id)
        .await?
        .ok_or(NotificationError::MissingSubscription(
            notification.subscription_id,
        ))?;
    let message = NotificationMessage::from_details(notification, &details);
    sink.deliver(&message).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use hoby_loop_core::{BasketId, Email, Frequency, Price, Role, SubscriptionStatus, UserId};

    use super::*;
    use crate::models::{Address, Basket, Subscription, User};

    struct FixedLookup(HashMap<SubscriptionId, SubscriptionDetails>);

    #[async_trait]
    impl SubscriptionLookup for FixedLookup {
        async fn subscription_details(
            &self,
            id: SubscriptionId,
        ) -> Result<Option<SubscriptionDetails>, RepositoryError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<NotificationMessage>>>);

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
            self.0.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn details(id: i32) -> SubscriptionDetails {
        let now = Utc::now();
        SubscriptionDetails {
            subscription: Subscription {
                id: SubscriptionId::new(id),
                user_id: UserId::new(2),
                basket_id: BasketId::new(3),
                frequency: Frequency::Weekly,
                status: SubscriptionStatus::Active,
                created_at: now,
                updated_at: now,
            },
            user: User {
                id: UserId::new(2),
                email: Email::parse("ana@example.com").unwrap(),
                password: String::new(),
                role: Role::Consumer,
                name: "Ana".to_string(),
                cnpj: None,
                cpf: None,
                is_active: true,
                permissions: None,
                address: Address::default(),
                created_at: now,
                updated_at: now,
            },
            basket: Basket {
                id: BasketId::new(3),
                seller_id: UserId::new(1),
                name: "Cesta Orgânica".to_string(),
                description: String::new(),
                price: Price::new(Decimal::new(4990, 2)).unwrap(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn notification(order: i32, subscription: i32) -> OrderNotification {
        OrderNotification {
            order_id: OrderId::new(order),
            subscription_id: SubscriptionId::new(subscription),
            status: OrderStatus::Shipped,
        }
    }

    #[tokio::test]
    async fn test_worker_resolves_and_delivers() {
        let lookup = FixedLookup(HashMap::from([(SubscriptionId::new(1), details(1))]));
        let sink = RecordingSink::default();
        let (dispatcher, handle) = NotificationDispatcher::spawn(8, lookup, sink.clone());

        assert!(dispatcher.dispatch(notification(10, 1)));
        drop(dispatcher);
        handle.await.unwrap();

        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_email, "ana@example.com");
        assert_eq!(sent[0].body, "Your 'Cesta Orgânica' is now shipped!");
    }

    #[tokio::test]
    async fn test_missing_subscription_is_skipped() {
        let lookup = FixedLookup(HashMap::from([(SubscriptionId::new(1), details(1))]));
        let sink = RecordingSink::default();
        let (dispatcher, handle) = NotificationDispatcher::spawn(8, lookup, sink.clone());

        assert!(dispatcher.dispatch(notification(10, 99)));
        assert!(dispatcher.dispatch(notification(11, 1)));
        drop(dispatcher);
        handle.await.unwrap();

        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, OrderId::new(11));
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (dispatcher, _rx) = NotificationDispatcher::channel(1);

        assert!(dispatcher.dispatch(notification(1, 1)));
        assert!(!dispatcher.dispatch(notification(2, 1)));
    }

    #[tokio::test]
    async fn test_closed_queue_drops() {
        let (dispatcher, rx) = NotificationDispatcher::channel(4);
        drop(rx);

        assert!(!dispatcher.dispatch(notification(1, 1)));
    }
}
