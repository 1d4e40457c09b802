//! Seller route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use vendora_core::{OrderId, OrderStatus, SellerId};

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAuth;
use crate::models::{Order, ProductPage, ProductQuery, Review, Seller, SellerSettings};
use crate::routes::auth::with_token_cookie;
use crate::services::orders::OrderView;
use crate::services::sellers::{ReviewInput, SellerService};
use crate::state::AppState;

/// A new seller profile and a token carrying the seller role.
#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub seller: Seller,
    pub token: String,
}

/// Order status change requested by a seller.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Become a seller.
///
/// The token is reissued because the caller's role changes.
///
/// # Route
///
/// `POST /api/sellers`
pub async fn onboard(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(form): Json<SellerSettings>,
) -> Result<Response> {
    let (seller, user) = SellerService::new(state.db())
        .onboard(claims.sub, form)
        .await?;
    let token = state.tokens().issue(&user)?;

    let response = (
        StatusCode::CREATED,
        Json(OnboardingResponse {
            seller: seller.owner_view(),
            token: token.clone(),
        }),
    )
        .into_response();
    Ok(with_token_cookie(response, &state, &token))
}

/// `GET /api/sellers/me`
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Seller>> {
    let seller = SellerService::new(state.db()).for_user(claims.sub).await?;
    Ok(Json(seller.owner_view()))
}

/// Public store page.
///
/// # Route
///
/// `GET /api/sellers/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<SellerId>) -> Result<Json<Seller>> {
    let seller = SellerService::new(state.db()).get(id).await?;
    Ok(Json(seller.public_view()))
}

/// `PATCH /api/sellers/{id}`
pub async fn update_settings(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<SellerId>,
    Json(settings): Json<SellerSettings>,
) -> Result<Json<Seller>> {
    let seller = SellerService::new(state.db())
        .update_settings(id, claims.sub, settings)
        .await?;
    Ok(Json(seller.owner_view()))
}

/// `GET /api/sellers/{id}/products`
pub async fn products(
    State(state): State<AppState>,
    Path(id): Path<SellerId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let page = SellerService::new(state.db()).products(id, query).await?;
    Ok(Json(page))
}

/// `GET /api/sellers/{id}/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<SellerId>,
) -> Result<Json<Vec<Order>>> {
    let orders = SellerService::new(state.db()).orders(id, claims.sub).await?;
    Ok(Json(orders))
}

/// `PATCH /api/sellers/{id}/orders/{order_id}`
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path((id, order_id)): Path<(SellerId, OrderId)>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<OrderView>> {
    let order = SellerService::new(state.db())
        .update_order_status(id, claims.sub, order_id, update.status)
        .await?;
    Ok(Json(order.into()))
}

/// `POST /api/sellers/{id}/reviews`
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<SellerId>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = SellerService::new(state.db())
        .add_review(id, claims.sub, input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
