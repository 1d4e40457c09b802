//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Accounts, password and Google sign-in
//! - `customers` - Profile, addresses, cart, wishlist and history
//! - `sellers` - Onboarding, storefront settings and reviews
//! - `products` - Catalog listing and seller-owned product management
//! - `orders` - Checkout, order visibility and status changes
//! - `tokens` - Signed session tokens
//! - `oauth` - Google OAuth client
//! - `uploads` - Image validation and hosting

pub mod auth;
pub mod customers;
pub mod error;
pub mod oauth;
pub mod orders;
pub mod products;
pub mod sellers;
pub mod tokens;
pub mod uploads;

pub use error::ServiceError;
