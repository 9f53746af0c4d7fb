//! Basket routes.

use axum::extract::State;
use serde::Deserialize;
use tracing::{info, instrument};

use hoby_loop_core::{BasketId, Price, UserId};

use super::{ApiJson, ApiPath};
use crate::db::BasketRepository;
use crate::db::baskets::NewBasket;
use crate::error::{ApiResponse, AppError, Result};
use crate::models::Basket;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBasketRequest {
    pub name: String,
    pub description: String,
    /// Must be positive; enforced while decoding.
    pub price: Price,
    pub seller_id: UserId,
}

/// Create a basket for a seller.
///
/// # Errors
///
/// 400 for blank fields, a non-positive price, or an unknown seller.
#[instrument(skip_all)]
pub async fn create_basket(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBasketRequest>,
) -> Result<ApiResponse<Basket>> {
    let name = request.name.trim();
    let description = request.description.trim();
    if name.is_empty() || description.is_empty() {
        return Err(AppError::bad_request(
            "Invalid basket data: name and description are required",
        ));
    }

    let basket = BasketRepository::new(state.pool())
        .create(&NewBasket {
            seller_id: request.seller_id,
            name: name.to_string(),
            description: description.to_string(),
            price: request.price,
        })
        .await?;

    info!(basket_id = %basket.id, seller_id = %basket.seller_id, "Basket created");
    Ok(ApiResponse::ok(basket))
}

/// Fetch a single basket.
///
/// # Errors
///
/// 404 if the basket does not exist.
pub async fn get_basket(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BasketId>,
) -> Result<ApiResponse<Basket>> {
    let basket = BasketRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Basket not found".into()))?;

    Ok(ApiResponse::ok(basket))
}

/// List every basket a seller offers.
///
/// # Errors
///
/// 500 if the query fails.
pub async fn seller_baskets(
    State(state): State<AppState>,
    ApiPath(seller_id): ApiPath<UserId>,
) -> Result<ApiResponse<Vec<Basket>>> {
    let baskets = BasketRepository::new(state.pool())
        .list_by_seller(seller_id)
        .await?;
    Ok(ApiResponse::ok(baskets))
}
