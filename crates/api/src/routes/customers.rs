//! Customer profile route handlers.
//!
//! Every route except `/me` names the customer in the path; only its owner may
//! use it (404 when missing, 403 when owned by someone else).

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use vendora_core::{AddressId, CustomerId, ProductId};

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::{
    ActivityEntry, Address, AddressInput, CustomerPreferences, Order, Product, TransactionRecord,
};
use crate::services::customers::{
    CartView, CustomerProfile, CustomerService, PreferencesUpdate, ProfileUpdate,
};
use crate::state::AppState;

/// Cart line change. Quantity 0 removes the line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Wishlist change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistChange {
    pub product_ids: Vec<ProductId>,
}

/// The caller's own profile.
///
/// # Route
///
/// `GET /api/customers/me`
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<CustomerProfile>> {
    let service = CustomerService::new(state.db());
    let customer = service.for_user(claims.sub).await?;
    Ok(Json(service.profile(customer.id, claims.sub).await?))
}

/// `GET /api/customers/{id}`
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerProfile>> {
    let profile = CustomerService::new(state.db()).profile(id, claims.sub).await?;
    Ok(Json(profile))
}

/// `PATCH /api/customers/{id}`
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<CustomerProfile>> {
    let profile = CustomerService::new(state.db())
        .update_profile(id, claims.sub, update)
        .await?;
    Ok(Json(profile))
}

/// `PATCH /api/customers/{id}/preferences`
pub async fn update_preferences(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<CustomerPreferences>> {
    let prefs = CustomerService::new(state.db())
        .update_preferences(id, claims.sub, update)
        .await?;
    Ok(Json(prefs))
}

// =============================================================================
// Addresses
// =============================================================================

/// `GET /api/customers/{id}/addresses`
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<Address>>> {
    let addresses = CustomerService::new(state.db()).addresses(id, claims.sub).await?;
    Ok(Json(addresses))
}

/// `POST /api/customers/{id}/addresses`
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Vec<Address>>)> {
    let addresses = CustomerService::new(state.db())
        .add_address(id, claims.sub, input)
        .await?;
    Ok((StatusCode::CREATED, Json(addresses)))
}

/// `PUT /api/customers/{id}/addresses/{address_id}`
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path((id, address_id)): Path<(CustomerId, AddressId)>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Vec<Address>>> {
    let addresses = CustomerService::new(state.db())
        .update_address(id, claims.sub, address_id, input)
        .await?;
    Ok(Json(addresses))
}

/// `DELETE /api/customers/{id}/addresses/{address_id}`
pub async fn remove_address(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path((id, address_id)): Path<(CustomerId, AddressId)>,
) -> Result<Json<Vec<Address>>> {
    let addresses = CustomerService::new(state.db())
        .remove_address(id, claims.sub, address_id)
        .await?;
    Ok(Json(addresses))
}

// =============================================================================
// Cart
// =============================================================================

/// `GET /api/customers/{id}/cart`
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<CartView>> {
    let cart = CustomerService::new(state.db()).cart(id, claims.sub).await?;
    Ok(Json(cart))
}

/// `PUT /api/customers/{id}/cart`
pub async fn set_cart_quantity(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
    Json(update): Json<CartUpdate>,
) -> Result<Json<CartView>> {
    let cart = CustomerService::new(state.db())
        .set_cart_quantity(id, claims.sub, update.product_id, update.quantity)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/customers/{id}/cart`
pub async fn clear_cart(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode> {
    CustomerService::new(state.db()).clear_cart(id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Wishlist
// =============================================================================

/// `GET /api/customers/{id}/wishlist`
pub async fn wishlist(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<Product>>> {
    let products = CustomerService::new(state.db()).wishlist(id, claims.sub).await?;
    Ok(Json(products))
}

/// `POST /api/customers/{id}/wishlist`
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
    Json(change): Json<WishlistChange>,
) -> Result<Json<Vec<Product>>> {
    let products = CustomerService::new(state.db())
        .add_to_wishlist(id, claims.sub, &change.product_ids)
        .await?;
    Ok(Json(products))
}

/// `DELETE /api/customers/{id}/wishlist`
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
    Json(change): Json<WishlistChange>,
) -> Result<Json<Vec<Product>>> {
    let products = CustomerService::new(state.db())
        .remove_from_wishlist(id, claims.sub, &change.product_ids)
        .await?;
    Ok(Json(products))
}

// =============================================================================
// History
// =============================================================================

/// `GET /api/customers/{id}/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<Order>>> {
    let orders = CustomerService::new(state.db()).orders(id, claims.sub).await?;
    Ok(Json(orders))
}

/// `GET /api/customers/{id}/transactions`
pub async fn transactions(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<TransactionRecord>>> {
    let records = CustomerService::new(state.db())
        .transactions(id, claims.sub)
        .await?;
    Ok(Json(records))
}

/// `GET /api/customers/{id}/activity`
pub async fn activity(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<ActivityEntry>>> {
    let entries = CustomerService::new(state.db()).activity(id, claims.sub).await?;
    Ok(Json(entries))
}
