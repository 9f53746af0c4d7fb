//! Subscription routes.

use axum::extract::State;
use serde::Deserialize;
use tracing::{info, instrument};

use hoby_loop_core::{BasketId, Frequency, UserId};

use super::{ApiJson, ApiPath};
use crate::db::SubscriptionRepository;
use crate::db::subscriptions::NewSubscription;
use crate::error::{ApiResponse, Result};
use crate::models::{Subscription, SubscriptionDetails};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: UserId,
    pub basket_id: BasketId,
    pub frequency: Frequency,
}

/// Subscribe a consumer to a basket. New subscriptions start `active`.
///
/// # Errors
///
/// 400 if the user or basket does not exist.
#[instrument(skip_all)]
pub async fn create_subscription(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSubscriptionRequest>,
) -> Result<ApiResponse<Subscription>> {
    let subscription = SubscriptionRepository::new(state.pool())
        .create(&NewSubscription {
            user_id: request.user_id,
            basket_id: request.basket_id,
            frequency: request.frequency,
        })
        .await?;

    info!(
        subscription_id = %subscription.id,
        user_id = %subscription.user_id,
        basket_id = %subscription.basket_id,
        "Subscription created"
    );
    Ok(ApiResponse::ok(subscription))
}

/// Subscriptions to any of a seller's baskets.
///
/// # Errors
///
/// 500 if the query fails.
pub async fn seller_subscriptions(
    State(state): State<AppState>,
    ApiPath(seller_id): ApiPath<UserId>,
) -> Result<ApiResponse<Vec<SubscriptionDetails>>> {
    let subscriptions = SubscriptionRepository::new(state.pool())
        .list_by_seller(seller_id)
        .await?;
    Ok(ApiResponse::ok(subscriptions))
}

/// A consumer's subscriptions.
///
/// # Errors
///
/// 500 if the query fails.
pub async fn consumer_subscriptions(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<ApiResponse<Vec<SubscriptionDetails>>> {
    let subscriptions = SubscriptionRepository::new(state.pool())
        .list_by_consumer(user_id)
        .await?;
    Ok(ApiResponse::ok(subscriptions))
}
