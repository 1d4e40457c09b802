//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Store connectivity
//!
//! # Auth (rate limited)
//! POST   /api/auth/register                    - Create account
//! POST   /api/auth/login                       - Password sign-in
//! POST   /api/auth/logout                      - Clear token cookie
//! GET    /api/auth/session                     - Current claims
//! GET    /api/auth/google/login                - Redirect to Google
//! GET    /api/auth/google/callback             - Google sign-in callback
//! POST   /api/auth/change-password             - Change password
//! PATCH  /api/auth/avatar                      - Change avatar, reissue token
//!
//! # Customers (owner only)
//! GET    /api/customers/me                     - Caller's profile
//! GET    /api/customers/{id}                   - Profile
//! PATCH  /api/customers/{id}                   - Update profile
//! PATCH  /api/customers/{id}/preferences       - Notification preferences
//! GET    /api/customers/{id}/addresses         - Address book
//! POST   /api/customers/{id}/addresses         - Add address
//! PUT    /api/customers/{id}/addresses/{aid}   - Replace address
//! DELETE /api/customers/{id}/addresses/{aid}   - Remove address
//! GET    /api/customers/{id}/cart              - Resolved cart
//! PUT    /api/customers/{id}/cart              - Set line quantity
//! DELETE /api/customers/{id}/cart              - Empty cart
//! GET    /api/customers/{id}/wishlist          - Resolved wishlist
//! POST   /api/customers/{id}/wishlist          - Add products
//! DELETE /api/customers/{id}/wishlist          - Remove products
//! GET    /api/customers/{id}/orders            - Order history
//! GET    /api/customers/{id}/transactions      - Payment history
//! GET    /api/customers/{id}/activity          - Recent activity
//!
//! # Sellers
//! POST   /api/sellers                          - Onboarding
//! GET    /api/sellers/me                       - Caller's store (owner view)
//! GET    /api/sellers/{id}                     - Public store page
//! PATCH  /api/sellers/{id}                     - Store settings (owner)
//! GET    /api/sellers/{id}/products            - Store listings
//! GET    /api/sellers/{id}/orders              - Store orders (owner)
//! PATCH  /api/sellers/{id}/orders/{oid}        - Order status (owner)
//! POST   /api/sellers/{id}/reviews             - Review (customer)
//!
//! # Products
//! GET    /api/products                         - Filtered, paginated catalog
//! GET    /api/products/{id}                    - Product
//! POST   /api/products                         - Create (seller)
//! PATCH  /api/products/{id}                    - Update (owning seller)
//! DELETE /api/products/{id}                    - Delete (owning seller)
//!
//! # Orders
//! POST   /api/orders                           - Checkout
//! GET    /api/orders/{id}                      - Order with timeline
//! POST   /api/orders/{id}/cancel               - Cancel (owning customer)
//!
//! # Upload
//! POST   /api/upload                           - Multipart image upload
//! ```

pub mod auth;
pub mod customers;
pub mod health;
pub mod orders;
pub mod products;
pub mod sellers;
pub mod upload;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};

use crate::middleware::auth_rate_limiter;
use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Request body limit on the upload route. Leaves room for multipart framing so
/// oversized files are reported by the upload check rather than cut off.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session))
        .route("/google/login", get(auth::google_login))
        .route("/google/callback", get(auth::google_callback))
        .route("/change-password", post(auth::change_password))
        .route("/avatar", patch(auth::update_avatar));

    if rate_limit {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(customers::me))
        .route(
            "/{id}",
            get(customers::profile).patch(customers::update_profile),
        )
        .route("/{id}/preferences", patch(customers::update_preferences))
        .route(
            "/{id}/addresses",
            get(customers::addresses).post(customers::add_address),
        )
        .route(
            "/{id}/addresses/{address_id}",
            axum::routing::put(customers::update_address).delete(customers::remove_address),
        )
        .route(
            "/{id}/cart",
            get(customers::cart)
                .put(customers::set_cart_quantity)
                .delete(customers::clear_cart),
        )
        .route(
            "/{id}/wishlist",
            get(customers::wishlist)
                .post(customers::add_to_wishlist)
                .delete(customers::remove_from_wishlist),
        )
        .route("/{id}/orders", get(customers::orders))
        .route("/{id}/transactions", get(customers::transactions))
        .route("/{id}/activity", get(customers::activity))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(sellers::onboard))
        .route("/me", get(sellers::me))
        .route("/{id}", get(sellers::show).patch(sellers::update_settings))
        .route("/{id}/products", get(sellers::products))
        .route("/{id}/orders", get(sellers::orders))
        .route("/{id}/orders/{order_id}", patch(sellers::update_order_status))
        .route("/{id}/reviews", post(sellers::add_review))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all routes for the API.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes(rate_limit))
        .nest("/api/customers", customer_routes())
        .nest("/api/sellers", seller_routes())
        .nest("/api/products", product_routes())
        .nest("/api/orders", order_routes())
        .route(
            "/api/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
