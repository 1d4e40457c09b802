//! Customer profile and its embedded shopping state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vendora_core::{
    AddressId, CustomerId, Money, OrderId, PaymentMethod, PaymentStatus, ProductId, TransactionId,
    UserId,
};

use super::{ValidationError, optional_text, required_text};

/// Maximum number of entries kept in the recent-activity log.
pub const MAX_ACTIVITY_ENTRIES: usize = 50;

/// Notification opt-ins for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPreferences {
    pub order_updates: bool,
    pub promotions: bool,
    pub newsletter: bool,
    pub sms: bool,
}

impl Default for CustomerPreferences {
    fn default() -> Self {
        Self {
            order_updates: true,
            promotions: true,
            newsletter: false,
            sms: false,
        }
    }
}

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub label: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

/// Address fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub label: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub line1: String,
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Validate the input and build an address with the given id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when a required field is blank.
    pub fn into_address(self, id: AddressId) -> Result<Address, ValidationError> {
        Ok(Address {
            id,
            label: optional_text(self.label.as_deref()),
            full_name: required_text("fullName", &self.full_name)?,
            phone: required_text("phone", &self.phone)?,
            line1: required_text("line1", &self.line1)?,
            line2: optional_text(self.line2.as_deref()),
            city: required_text("city", &self.city)?,
            state: required_text("state", &self.state)?,
            postal_code: required_text("postalCode", &self.postal_code)?,
            country: required_text("country", &self.country)?,
            is_default: self.is_default,
        })
    }
}

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// Outcome of a cart quantity update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended.
    Added,
    /// An existing line's quantity changed.
    Updated,
    /// The line was removed (quantity zero).
    Removed,
    /// Quantity zero for a product that was not in the cart.
    Unchanged,
}

/// A payment recorded against one of the customer's orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Category of a recent-activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Cart,
    Wishlist,
    Order,
    Profile,
    Review,
}

/// One line of the recent-activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// A customer profile (one per customer user).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferences: CustomerPreferences,
    pub addresses: Vec<Address>,
    pub cart: Vec<CartItem>,
    pub wishlist: Vec<ProductId>,
    pub orders: Vec<OrderId>,
    pub transactions: Vec<TransactionRecord>,
    pub recent_activity: Vec<ActivityEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
}

impl Customer {
    /// A fresh profile with default preferences and empty collections.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CustomerId::new(),
            user_id,
            phone: None,
            date_of_birth: None,
            preferences: CustomerPreferences::default(),
            addresses: Vec::new(),
            cart: Vec::new(),
            wishlist: Vec::new(),
            orders: Vec::new(),
            transactions: Vec::new(),
            recent_activity: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Set the quantity of a product in the cart.
    ///
    /// Zero removes the line. A positive quantity replaces the quantity of an
    /// existing line, or appends a new line stamped with `now`.
    pub fn set_cart_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> CartChange {
        let existing = self.cart.iter().position(|i| i.product_id == product_id);

        match (existing, quantity) {
            (Some(idx), 0) => {
                self.cart.remove(idx);
                CartChange::Removed
            }
            (None, 0) => CartChange::Unchanged,
            (Some(idx), qty) => {
                if let Some(item) = self.cart.get_mut(idx) {
                    item.quantity = qty;
                }
                CartChange::Updated
            }
            (None, qty) => {
                self.cart.push(CartItem {
                    product_id,
                    quantity: qty,
                    added_at: now,
                });
                CartChange::Added
            }
        }
    }

    /// Drop the given products from the cart.
    pub fn remove_cart_lines(&mut self, product_ids: &[ProductId]) {
        self.cart.retain(|item| !product_ids.contains(&item.product_id));
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Add products to the wishlist, skipping ones already present.
    ///
    /// Returns the number of products actually added.
    pub fn add_to_wishlist(&mut self, product_ids: &[ProductId]) -> usize {
        let before = self.wishlist.len();
        for id in product_ids {
            if !self.wishlist.contains(id) {
                self.wishlist.push(*id);
            }
        }
        self.wishlist.len() - before
    }

    /// Remove products from the wishlist.
    ///
    /// Returns the number of products removed.
    pub fn remove_from_wishlist(&mut self, product_ids: &[ProductId]) -> usize {
        let before = self.wishlist.len();
        self.wishlist.retain(|id| !product_ids.contains(id));
        before - self.wishlist.len()
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Add an address.
    ///
    /// The first address always becomes the default; an address submitted as
    /// default takes the flag from every other address.
    pub fn add_address(&mut self, mut address: Address) -> AddressId {
        if self.addresses.is_empty() {
            address.is_default = true;
        }
        if address.is_default {
            self.clear_default();
        }
        let id = address.id;
        self.addresses.push(address);
        id
    }

    /// Replace an existing address, keeping its id.
    ///
    /// Returns `false` if no address has that id. Un-flagging the only default
    /// address leaves it as the default.
    pub fn update_address(&mut self, mut address: Address) -> bool {
        let Some(idx) = self.addresses.iter().position(|a| a.id == address.id) else {
            return false;
        };

        let was_default = self.addresses.get(idx).is_some_and(|a| a.is_default);
        if address.is_default {
            self.clear_default();
        } else if was_default {
            address.is_default = true;
        }

        if let Some(slot) = self.addresses.get_mut(idx) {
            *slot = address;
        }
        true
    }

    /// Remove an address. If it was the default, the first remaining address
    /// is promoted.
    ///
    /// Returns `false` if no address has that id.
    pub fn remove_address(&mut self, id: AddressId) -> bool {
        let Some(idx) = self.addresses.iter().position(|a| a.id == id) else {
            return false;
        };

        let removed = self.addresses.remove(idx);
        if removed.is_default
            && let Some(first) = self.addresses.first_mut()
        {
            first.is_default = true;
        }
        true
    }

    /// The default shipping address, if any.
    #[must_use]
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }

    /// Look up a saved address.
    #[must_use]
    pub fn address(&self, id: AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == id)
    }

    fn clear_default(&mut self) {
        for existing in &mut self.addresses {
            existing.is_default = false;
        }
    }

    // =========================================================================
    // Orders & activity
    // =========================================================================

    /// Attach a placed order and its payment record.
    pub fn record_order(&mut self, order_id: OrderId, transaction: TransactionRecord) {
        if !self.orders.contains(&order_id) {
            self.orders.push(order_id);
        }
        self.transactions.push(transaction);
    }

    /// Update the status of the transaction recorded for an order.
    pub fn set_transaction_status(&mut self, order_id: OrderId, status: PaymentStatus) {
        for tx in self.transactions.iter_mut().filter(|t| t.order_id == order_id) {
            tx.status = status;
        }
    }

    /// Prepend an entry to the activity log, trimming it to
    /// [`MAX_ACTIVITY_ENTRIES`].
    pub fn log_activity(&mut self, kind: ActivityKind, message: impl Into<String>, at: DateTime<Utc>) {
        self.recent_activity.insert(
            0,
            ActivityEntry {
                kind,
                message: message.into(),
                at,
            },
        );
        self.recent_activity.truncate(MAX_ACTIVITY_ENTRIES);
    }
}
