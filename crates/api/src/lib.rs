//! Hoby Loop API library.
//!
//! Sellers list baskets, consumers subscribe to them, and sellers issue
//! delivery orders against subscriptions. This crate holds everything that
//! touches `PostgreSQL` or HTTP:
//!
//! - [`db`] - repositories and embedded migrations
//! - [`seed`] - the reconciling seeder
//! - [`services`] - order notifications
//! - [`routes`] - the axum HTTP surface, assembled by [`app`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderName, Method, header},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{USER_ID_HEADER, identity_middleware};
use crate::state::AppState;

/// Build the application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Any origin, the methods the API uses, and the `X-User-ID` header.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
        ])
}
