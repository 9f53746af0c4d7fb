//! Admin listings. Every handler takes [`RequireAdmin`].

use axum::extract::State;
use tracing::debug;

use crate::db::{BasketRepository, SubscriptionRepository, UserRepository};
use crate::error::{ApiResponse, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Basket, SubscriptionDetails, User};
use crate::state::AppState;

/// Every user.
///
/// # Errors
///
/// 401/403 for non-admin callers, 500 if the query fails.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<Vec<User>>> {
    let users = UserRepository::new(state.pool()).list_all().await?;
    debug!(admin_id = %admin.id, count = users.len(), "Admin listed users");
    Ok(ApiResponse::ok(users))
}

/// Every basket.
///
/// # Errors
///
/// 401/403 for non-admin callers, 500 if the query fails.
pub async fn list_baskets(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<Vec<Basket>>> {
    let baskets = BasketRepository::new(state.pool()).list_all().await?;
    debug!(admin_id = %admin.id, count = baskets.len(), "Admin listed baskets");
    Ok(ApiResponse::ok(baskets))
}

/// Every subscription with its consumer and basket.
///
/// # Errors
///
/// 401/403 for non-admin callers, 500 if the query fails.
pub async fn list_subscriptions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<Vec<SubscriptionDetails>>> {
    let subscriptions = SubscriptionRepository::new(state.pool()).list_all().await?;
    debug!(admin_id = %admin.id, count = subscriptions.len(), "Admin listed subscriptions");
    Ok(ApiResponse::ok(subscriptions))
}
