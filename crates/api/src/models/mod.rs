//! Domain models for the marketplace.
//!
//! These are the five stored documents (users, customers, sellers, products,
//! orders) together with the embedded sub-documents they carry. The rules that
//! keep a document internally consistent (cart merge, wishlist dedup, single
//! default address, derived product status, order status moves) live here as
//! plain methods so every store backend shares them.

pub mod customer;
pub mod order;
pub mod product;
pub mod seller;
pub mod session;
pub mod user;

pub use customer::{
    ActivityEntry, ActivityKind, Address, AddressInput, CartItem, CartChange, Customer,
    CustomerPreferences, TransactionRecord,
};
pub use order::{Order, OrderItem, OrderPricing, PaymentInfo, TimelineStep};
pub use product::{Product, ProductDraft, ProductPage, ProductQuery, ProductUpdate};
pub use seller::{
    BankDetails, BusinessAddress, Review, Seller, SellerContact, SellerMetrics,
    SellerPreferences, SellerSettings,
};
pub use session::SessionClaims;
pub use user::User;

use thiserror::Error;

/// A request carried data that breaks a document rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Error for a required field that is missing or blank.
    #[must_use]
    pub fn required(field: &str) -> Self {
        Self(format!("{field} is required"))
    }
}

/// Trim a required text field, rejecting blanks.
///
/// # Errors
///
/// Returns `ValidationError` naming `field` when the value is empty after trimming.
pub fn required_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional text field, mapping blanks to `None`.
#[must_use]
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
