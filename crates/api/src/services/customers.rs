//! Customer profile, address book, cart, wishlist and history.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vendora_core::{AddressId, CustomerId, Money, ProductId, UserId};

use crate::db::{Database, RepositoryError};
use crate::models::{
    ActivityEntry, ActivityKind, Address, AddressInput, CartChange, Customer, CustomerPreferences,
    Order, Product, TransactionRecord, User, optional_text, required_text,
};
use crate::services::auth::{AuthError, AuthService};
use crate::services::error::{ServiceError, should_retry};

/// Profile as returned to its owner: the customer document plus account fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    #[serde(flatten)]
    pub customer: Customer,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl CustomerProfile {
    fn new(customer: Customer, user: &User) -> Self {
        Self {
            customer,
            name: user.name.clone(),
            email: user.email.as_str().to_owned(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Profile fields a customer may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Partial notification preference change.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub order_updates: Option<bool>,
    pub promotions: Option<bool>,
    pub newsletter: Option<bool>,
    pub sms: Option<bool>,
}

impl PreferencesUpdate {
    fn apply_to(self, prefs: &mut CustomerPreferences) {
        if let Some(v) = self.order_updates {
            prefs.order_updates = v;
        }
        if let Some(v) = self.promotions {
            prefs.promotions = v;
        }
        if let Some(v) = self.newsletter {
            prefs.newsletter = v;
        }
        if let Some(v) = self.sms {
            prefs.sms = v;
        }
    }
}

/// A cart line with its current product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub added_at: chrono::DateTime<Utc>,
    pub product: Product,
    pub line_total: Money,
}

/// The resolved cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: Money,
}

/// Customer operations. Every call names the customer and the calling user;
/// only the owning user may read or change a profile.
pub struct CustomerService<'a> {
    db: &'a Database,
}

impl<'a> CustomerService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The caller's own customer profile.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the caller has no customer profile.
    pub async fn for_user(&self, user_id: UserId) -> Result<Customer, ServiceError> {
        self.db
            .customers()
            .find_by_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))
    }

    /// Load a customer the caller owns.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id and
    /// `ServiceError::Forbidden` when the caller is not the owner.
    pub async fn get(&self, id: CustomerId, caller: UserId) -> Result<Customer, ServiceError> {
        let customer = self
            .db
            .customers()
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))?;
        if customer.user_id != caller {
            return Err(ServiceError::Forbidden("not your customer profile"));
        }
        Ok(customer)
    }

    /// Profile with account fields.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn profile(
        &self,
        id: CustomerId,
        caller: UserId,
    ) -> Result<CustomerProfile, ServiceError> {
        let customer = self.get(id, caller).await?;
        let user = self
            .db
            .users()
            .find_by_id(customer.user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        Ok(CustomerProfile::new(customer, &user))
    }

    /// Update name, phone and date of birth.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a blank name.
    pub async fn update_profile(
        &self,
        id: CustomerId,
        caller: UserId,
        update: ProfileUpdate,
    ) -> Result<CustomerProfile, ServiceError> {
        if let Some(name) = &update.name {
            required_text("name", name)?;
        }

        // The rename goes first so a failed rename logs no activity
        let user_id = self.get(id, caller).await?.user_id;
        let auth = AuthService::new(self.db);
        let user = match update.name.as_deref() {
            Some(name) => auth.rename(user_id, name).await,
            None => auth.get_user(user_id).await,
        }
        .map_err(|e| match e {
            AuthError::Validation(v) => ServiceError::Validation(v),
            AuthError::Repository(r) => ServiceError::Repository(r),
            _ => ServiceError::NotFound("user"),
        })?;

        let (customer, ()) = self
            .modify(id, caller, |c| {
                if let Some(phone) = &update.phone {
                    c.phone = optional_text(Some(phone));
                }
                if let Some(dob) = update.date_of_birth {
                    c.date_of_birth = Some(dob);
                }
                c.log_activity(ActivityKind::Profile, "Updated profile", Utc::now());
                Ok(())
            })
            .await?;

        Ok(CustomerProfile::new(customer, &user))
    }

    /// Change notification preferences.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn update_preferences(
        &self,
        id: CustomerId,
        caller: UserId,
        update: PreferencesUpdate,
    ) -> Result<CustomerPreferences, ServiceError> {
        let (customer, ()) = self
            .modify(id, caller, |c| {
                update.apply_to(&mut c.preferences);
                Ok(())
            })
            .await?;
        Ok(customer.preferences)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Saved addresses.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn addresses(
        &self,
        id: CustomerId,
        caller: UserId,
    ) -> Result<Vec<Address>, ServiceError> {
        Ok(self.get(id, caller).await?.addresses)
    }

    /// Add an address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when a required field is blank.
    pub async fn add_address(
        &self,
        id: CustomerId,
        caller: UserId,
        input: AddressInput,
    ) -> Result<Vec<Address>, ServiceError> {
        let address = input.into_address(AddressId::new())?;
        let (customer, ()) = self
            .modify(id, caller, |c| {
                c.add_address(address.clone());
                c.log_activity(ActivityKind::Profile, "Added a shipping address", Utc::now());
                Ok(())
            })
            .await?;
        Ok(customer.addresses)
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the address does not exist.
    pub async fn update_address(
        &self,
        id: CustomerId,
        caller: UserId,
        address_id: AddressId,
        input: AddressInput,
    ) -> Result<Vec<Address>, ServiceError> {
        let address = input.into_address(address_id)?;
        let (customer, ()) = self
            .modify(id, caller, |c| {
                if c.update_address(address.clone()) {
                    Ok(())
                } else {
                    Err(ServiceError::NotFound("address"))
                }
            })
            .await?;
        Ok(customer.addresses)
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the address does not exist.
    pub async fn remove_address(
        &self,
        id: CustomerId,
        caller: UserId,
        address_id: AddressId,
    ) -> Result<Vec<Address>, ServiceError> {
        let (customer, ()) = self
            .modify(id, caller, |c| {
                if c.remove_address(address_id) {
                    Ok(())
                } else {
                    Err(ServiceError::NotFound("address"))
                }
            })
            .await?;
        Ok(customer.addresses)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The cart with product details. Lines for deleted products are skipped.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn cart(&self, id: CustomerId, caller: UserId) -> Result<CartView, ServiceError> {
        let customer = self.get(id, caller).await?;
        self.resolve_cart(&customer).await
    }

    /// Set a product's cart quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` when adding a product that does not exist.
    pub async fn set_cart_quantity(
        &self,
        id: CustomerId,
        caller: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, ServiceError> {
        let product = self.db.products().find_by_id(product_id).await?;
        if product.is_none() && quantity > 0 {
            return Err(ServiceError::NotFound("product"));
        }
        let name = product.map_or_else(|| "item".to_owned(), |p| p.name);

        let (customer, change) = self
            .modify(id, caller, |c| {
                let change = c.set_cart_quantity(product_id, quantity, Utc::now());
                let message = match change {
                    CartChange::Added => Some(format!("Added {name} to cart")),
                    CartChange::Updated => Some(format!("Changed {name} quantity to {quantity}")),
                    CartChange::Removed => Some(format!("Removed {name} from cart")),
                    CartChange::Unchanged => None,
                };
                if let Some(message) = message {
                    c.log_activity(ActivityKind::Cart, message, Utc::now());
                }
                Ok(change)
            })
            .await?;

        tracing::debug!(customer_id = %id, %product_id, ?change, "cart updated");
        self.resolve_cart(&customer).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn clear_cart(&self, id: CustomerId, caller: UserId) -> Result<(), ServiceError> {
        self.modify(id, caller, |c| {
            c.clear_cart();
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn resolve_cart(&self, customer: &Customer) -> Result<CartView, ServiceError> {
        let ids: Vec<ProductId> = customer.cart.iter().map(|i| i.product_id).collect();
        let products = self.db.products().find_by_ids(&ids).await?;

        let items: Vec<CartLine> = customer
            .cart
            .iter()
            .filter_map(|item| {
                let product = products.iter().find(|p| p.id == item.product_id)?.clone();
                Some(CartLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    added_at: item.added_at,
                    line_total: product.unit_price().times(item.quantity),
                    product,
                })
            })
            .collect();
        let subtotal = items.iter().map(|l| l.line_total).sum();

        Ok(CartView { items, subtotal })
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Wishlisted products. Deleted products are skipped.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn wishlist(
        &self,
        id: CustomerId,
        caller: UserId,
    ) -> Result<Vec<Product>, ServiceError> {
        let customer = self.get(id, caller).await?;
        self.resolve_wishlist(&customer).await
    }

    /// Add products to the wishlist.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn add_to_wishlist(
        &self,
        id: CustomerId,
        caller: UserId,
        product_ids: &[ProductId],
    ) -> Result<Vec<Product>, ServiceError> {
        let (customer, _) = self
            .modify(id, caller, |c| {
                let added = c.add_to_wishlist(product_ids);
                if added > 0 {
                    c.log_activity(
                        ActivityKind::Wishlist,
                        format!("Added {added} item(s) to wishlist"),
                        Utc::now(),
                    );
                }
                Ok(added)
            })
            .await?;
        self.resolve_wishlist(&customer).await
    }

    /// Remove products from the wishlist.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn remove_from_wishlist(
        &self,
        id: CustomerId,
        caller: UserId,
        product_ids: &[ProductId],
    ) -> Result<Vec<Product>, ServiceError> {
        let (customer, _) = self
            .modify(id, caller, |c| {
                let removed = c.remove_from_wishlist(product_ids);
                if removed > 0 {
                    c.log_activity(
                        ActivityKind::Wishlist,
                        format!("Removed {removed} item(s) from wishlist"),
                        Utc::now(),
                    );
                }
                Ok(removed)
            })
            .await?;
        self.resolve_wishlist(&customer).await
    }

    async fn resolve_wishlist(&self, customer: &Customer) -> Result<Vec<Product>, ServiceError> {
        let products = self.db.products().find_by_ids(&customer.wishlist).await?;
        Ok(customer
            .wishlist
            .iter()
            .filter_map(|id| products.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Orders, newest first.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn orders(&self, id: CustomerId, caller: UserId) -> Result<Vec<Order>, ServiceError> {
        let customer = self.get(id, caller).await?;
        Ok(self.db.orders().list_for_customer(customer.id).await?)
    }

    /// Payment records, newest first.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn transactions(
        &self,
        id: CustomerId,
        caller: UserId,
    ) -> Result<Vec<TransactionRecord>, ServiceError> {
        let mut transactions = self.get(id, caller).await?.transactions;
        transactions.reverse();
        Ok(transactions)
    }

    /// Recent activity, newest first.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn activity(
        &self,
        id: CustomerId,
        caller: UserId,
    ) -> Result<Vec<ActivityEntry>, ServiceError> {
        Ok(self.get(id, caller).await?.recent_activity)
    }

    /// Read-modify-write an owned customer, retrying stale writes.
    async fn modify<T>(
        &self,
        id: CustomerId,
        caller: UserId,
        change: impl FnMut(&mut Customer) -> Result<T, ServiceError> + Send,
    ) -> Result<(Customer, T), ServiceError> {
        self.update_with(id, Some(caller), change).await
    }

    /// Read-modify-write a customer, retrying stale writes. When `owner` is
    /// given the customer must belong to that user.
    pub(crate) async fn update_with<T>(
        &self,
        id: CustomerId,
        owner: Option<UserId>,
        mut change: impl FnMut(&mut Customer) -> Result<T, ServiceError> + Send,
    ) -> Result<(Customer, T), ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut customer = match owner {
                Some(caller) => self.get(id, caller).await?,
                None => self
                    .db
                    .customers()
                    .find_by_id(id)
                    .await?
                    .ok_or(ServiceError::NotFound("customer"))?,
            };
            let out = change(&mut customer)?;
            match self.db.customers().update(&mut customer).await {
                Ok(()) => return Ok((customer, out)),
                Err(e) if should_retry(&e, attempt) => {}
                Err(RepositoryError::NotFound) => return Err(ServiceError::NotFound("customer")),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
