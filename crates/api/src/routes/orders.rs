//! Checkout and order route handlers.

use axum::{extract::State, http::StatusCode};

use vendora_core::OrderId;

use crate::error::{Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::services::orders::{OrderService, OrderView, PlaceOrder};
use crate::state::AppState;

/// Place an order from explicit items or the caller's cart.
///
/// # Route
///
/// `POST /api/orders`
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let order = OrderService::new(state.db()).place(claims.sub, request).await?;
    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let view = OrderService::new(state.db()).get(id, &claims).await?;
    Ok(Json(view))
}

/// `POST /api/orders/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.db()).cancel(id, claims.sub).await?;
    Ok(Json(order.into()))
}
