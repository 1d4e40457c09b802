//! Catalog route handlers.

use axum::{extract::State, http::StatusCode};

use vendora_core::ProductId;

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAuth;
use crate::models::{Product, ProductDraft, ProductPage, ProductQuery, ProductUpdate};
use crate::services::products::ProductService;
use crate::state::AppState;

/// `GET /api/products`
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let page = ProductService::new(state.db()).list(&query).await?;
    Ok(Json(page))
}

/// `GET /api/products/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<Product>> {
    let product = ProductService::new(state.db()).get(id).await?;
    Ok(Json(product))
}

/// List a new product in the caller's store.
///
/// # Route
///
/// `POST /api/products`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = ProductService::new(state.db())
        .create(claims.sub, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PATCH /api/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    let product = ProductService::new(state.db())
        .update(id, claims.sub, update)
        .await?;
    Ok(Json(product))
}

/// `DELETE /api/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductService::new(state.db()).delete(id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
