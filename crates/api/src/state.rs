//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::services::NotificationDispatcher;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// connection pool and the notification queue.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    notifications: NotificationDispatcher,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    /// * `notifications` - Queue for order status notifications
    #[must_use]
    pub fn new(pool: PgPool, notifications: NotificationDispatcher) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                notifications,
            }),
        }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the order notification queue.
    #[must_use]
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.inner.notifications
    }
}
