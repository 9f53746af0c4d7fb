//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /ping                         - Liveness check with envelope
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (database)
//!
//! # Auth
//! POST /login                        - Look up a user by email
//! POST /register                     - Create a seller or consumer
//!
//! # Users
//! PUT  /users/{id}                   - Update profile fields
//! GET  /users/{id}/subscriptions     - A consumer's subscriptions
//!
//! # Baskets
//! POST /baskets                      - Create a basket
//! GET  /baskets/{id}                 - Basket detail
//! GET  /baskets/{id}/orders          - Orders across the basket's subscriptions
//! GET  /sellers/{id}/baskets         - A seller's baskets
//! GET  /sellers/{id}/subscriptions   - Subscriptions to a seller's baskets
//!
//! # Subscriptions
//! POST /subscriptions                - Subscribe to a basket
//! GET  /subscriptions/{id}/orders    - A subscription's orders, newest first
//!
//! # Orders
//! POST /orders                       - Create an order and queue a notification
//! GET  /orders/{id}                  - Order detail with subscription
//! PUT  /orders/{id}/status           - Advance an order and queue a notification
//!
//! # Admin (requires an admin `X-User-ID`)
//! GET  /admin/users                  - Every user
//! GET  /admin/baskets                - Every basket
//! GET  /admin/subscriptions          - Every subscription with user and basket
//! ```

pub mod admin;
pub mod auth;
pub mod baskets;
pub mod health;
pub mod orders;
pub mod subscriptions;
pub mod users;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor that rejects with the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor that rejects with the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Create the full API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(health::ping))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/users/{id}", put(users::update_user))
        .route(
            "/users/{id}/subscriptions",
            get(subscriptions::consumer_subscriptions),
        )
        .route("/baskets", post(baskets::create_basket))
        .route("/baskets/{id}", get(baskets::get_basket))
        .route("/baskets/{id}/orders", get(orders::basket_orders))
        .route("/sellers/{id}/baskets", get(baskets::seller_baskets))
        .route(
            "/sellers/{id}/subscriptions",
            get(subscriptions::seller_subscriptions),
        )
        .route("/subscriptions", post(subscriptions::create_subscription))
        .route(
            "/subscriptions/{id}/orders",
            get(orders::subscription_orders),
        )
        .route("/orders", post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", put(orders::update_order_status))
        .nest("/admin", admin_routes())
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/baskets", get(admin::list_baskets))
        .route("/subscriptions", get(admin::list_subscriptions))
}

/// Treat blank strings as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
