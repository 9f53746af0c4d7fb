//! Order routes.
//!
//! Creating an order or changing its status queues an order notification
//! after the write succeeds. The response never waits for delivery.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use hoby_loop_core::{BasketId, OrderId, OrderStatus, SubscriptionId};

use super::{ApiJson, ApiPath, non_blank};
use crate::db::{OrderRepository, RepositoryError, SubscriptionRepository};
use crate::error::{ApiResponse, AppError, Result};
use crate::models::{Order, SubscriptionDetails};
use crate::services::OrderNotification;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub subscription_id: SubscriptionId,
    /// Anything but `preparing`.
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    /// One of `preparing`, `shipped`, `delivered`.
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub message: &'static str,
}

/// An order with the subscription it delivers.
#[derive(Debug, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub subscription: SubscriptionDetails,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an order against an existing subscription.
///
/// # Errors
///
/// 400 for a `preparing` status, 404 if the subscription does not exist.
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<ApiResponse<CreatedOrder>> {
    if !request.status.is_create_status() {
        return Err(AppError::invalid(
            "Invalid order data",
            format!(
                "status must be one of processing, shipped, delivered, cancelled (got {})",
                request.status
            ),
        ));
    }

    SubscriptionRepository::new(state.pool())
        .get_by_id(request.subscription_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".into()))?;

    let order = OrderRepository::new(state.pool())
        .create(request.subscription_id, request.status)
        .await
        .map_err(|e| match e {
            // Deleted between the check and the insert.
            RepositoryError::MissingReference(_) => {
                AppError::NotFound("Subscription not found".into())
            }
            other => other.into(),
        })?;

    info!(order_id = %order.id, subscription_id = %order.subscription_id, "Order created");
    notify(&state, &order);

    Ok(ApiResponse::ok(CreatedOrder {
        order,
        message: "Order created and notification queued",
    }))
}

/// Fetch an order with its subscription, consumer and basket.
///
/// # Errors
///
/// 404 if the order does not exist.
pub async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<OrderDetails>> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let subscription = SubscriptionRepository::new(state.pool())
        .get_details(order.subscription_id)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order {} references missing subscription {}",
                order.id, order.subscription_id
            ))
        })?;

    Ok(ApiResponse::ok(OrderDetails {
        order,
        subscription,
    }))
}

/// Move an order to `preparing`, `shipped` or `delivered`.
///
/// # Errors
///
/// 400 for any other status, 404 if the order does not exist.
#[instrument(skip(state, request))]
pub async fn update_order_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> Result<ApiResponse<Order>> {
    if !request.status.is_update_target() {
        return Err(AppError::invalid(
            "Invalid status data",
            format!(
                "status must be one of preparing, shipped, delivered (got {})",
                request.status
            ),
        ));
    }

    let tracking_code = non_blank(request.tracking_code);
    let order = OrderRepository::new(state.pool())
        .update_status(id, request.status, tracking_code.as_deref())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Order not found".into()),
            other => other.into(),
        })?;

    info!(order_id = %order.id, status = %order.status, "Order status updated");
    notify(&state, &order);

    Ok(ApiResponse::ok(order))
}

/// A subscription's orders, newest first.
///
/// # Errors
///
/// 500 if the query fails.
pub async fn subscription_orders(
    State(state): State<AppState>,
    ApiPath(subscription_id): ApiPath<SubscriptionId>,
) -> Result<ApiResponse<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_subscription(subscription_id)
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// Orders across every subscription to a basket, newest first.
///
/// # Errors
///
/// 500 if the query fails.
pub async fn basket_orders(
    State(state): State<AppState>,
    ApiPath(basket_id): ApiPath<BasketId>,
) -> Result<ApiResponse<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_basket(basket_id)
        .await?;
    Ok(ApiResponse::ok(orders))
}

fn notify(state: &AppState, order: &Order) {
    state.notifications().dispatch(OrderNotification {
        order_id: order.id,
        subscription_id: order.subscription_id,
        status: order.status,
    });
}
