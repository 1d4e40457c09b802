//! Document stores for the marketplace.
//!
//! Each collection sits behind an `async_trait` store trait with two
//! implementations: [`postgres`] for deployments and [`memory`] for local
//! development and tests. Handlers and services only see the traits, bundled
//! together in [`Database`].
//!
//! # Tables
//!
//! - `users` - Accounts and password hashes
//! - `customers` - Customer profiles (cart, wishlist, addresses as JSONB)
//! - `sellers` - Seller profiles (contact, metrics, reviews as JSONB)
//! - `products` - Listings
//! - `orders` - Placed orders with item snapshots
//! - `tower_sessions.session` - OAuth handshake sessions
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p vendora-cli -- migrate
//! ```
//!
//! # Concurrency
//!
//! Updates are compare-and-swap on the `version` column. A write made from a
//! stale copy fails with [`RepositoryError::Stale`]; callers re-read and retry.

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use vendora_core::{CustomerId, Email, OrderId, ProductId, SellerId, UserId};

use crate::models::{Customer, Order, Product, ProductPage, ProductQuery, Seller, User};

/// Errors that can occur in store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The document changed since it was read.
    #[error("document was modified concurrently")]
    Stale,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user by (normalized) email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a new user. `Conflict` if the email is taken.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    /// Write back a modified user, bumping its version.
    async fn update(&self, user: &mut User) -> Result<(), RepositoryError>;

    /// Delete a user. `NotFound` if it does not exist.
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Customer profile storage.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError>;

    /// Insert a profile. `Conflict` if the user already has one.
    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError>;

    async fn update(&self, customer: &mut Customer) -> Result<(), RepositoryError>;

    async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError>;
}

/// Seller profile storage.
#[async_trait]
pub trait SellerStore: Send + Sync {
    async fn find_by_id(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Seller>, RepositoryError>;

    /// Insert a profile. `Conflict` if the user already has one.
    async fn insert(&self, seller: &Seller) -> Result<(), RepositoryError>;

    async fn update(&self, seller: &mut Seller) -> Result<(), RepositoryError>;

    async fn delete(&self, id: SellerId) -> Result<(), RepositoryError>;
}

/// Product listing storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch several products. Unknown ids are skipped; order is not preserved.
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Filtered, paginated listing, newest first.
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError>;

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError>;

    async fn update(&self, product: &mut Product) -> Result<(), RepositoryError>;

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A customer's orders, newest first.
    async fn list_for_customer(&self, customer_id: CustomerId)
    -> Result<Vec<Order>, RepositoryError>;

    /// Orders with at least one line sold by `seller_id`, newest first.
    async fn list_for_seller(&self, seller_id: SellerId) -> Result<Vec<Order>, RepositoryError>;

    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn update(&self, order: &mut Order) -> Result<(), RepositoryError>;
}

/// The full set of stores, cheap to clone.
#[derive(Clone)]
pub struct Database {
    users: Arc<dyn UserStore>,
    customers: Arc<dyn CustomerStore>,
    sellers: Arc<dyn SellerStore>,
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    pool: Option<PgPool>,
}

impl Database {
    /// Stores backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserStore::new(pool.clone())),
            customers: Arc::new(postgres::PgCustomerStore::new(pool.clone())),
            sellers: Arc::new(postgres::PgSellerStore::new(pool.clone())),
            products: Arc::new(postgres::PgProductStore::new(pool.clone())),
            orders: Arc::new(postgres::PgOrderStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Empty in-process stores.
    #[must_use]
    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            customers: store.clone(),
            sellers: store.clone(),
            products: store.clone(),
            orders: store,
            pool: None,
        }
    }

    /// Replace the user store.
    #[must_use]
    pub fn with_users(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = users;
        self
    }

    /// Replace the customer store.
    #[must_use]
    pub fn with_customers(mut self, customers: Arc<dyn CustomerStore>) -> Self {
        self.customers = customers;
        self
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn customers(&self) -> &dyn CustomerStore {
        self.customers.as_ref()
    }

    #[must_use]
    pub fn sellers(&self) -> &dyn SellerStore {
        self.sellers.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductStore {
        self.products.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.orders.as_ref()
    }

    /// The underlying pool, when backed by `PostgreSQL`.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Check that the backing store answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the pool cannot run a query.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &if self.pool.is_some() { "postgres" } else { "memory" })
            .finish_non_exhaustive()
    }
}
