//! Customer profiles.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use vendora_core::{CustomerId, OrderId, ProductId, UserId};

use super::{conflict_on_unique, deleted, finish_update};
use crate::db::{CustomerStore, RepositoryError};
use crate::models::{
    ActivityEntry, Address, CartItem, Customer, CustomerPreferences, TransactionRecord,
};

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    user_id: UserId,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    preferences: Json<CustomerPreferences>,
    addresses: Json<Vec<Address>>,
    cart: Json<Vec<CartItem>>,
    wishlist: Vec<ProductId>,
    orders: Vec<OrderId>,
    transactions: Json<Vec<TransactionRecord>>,
    recent_activity: Json<Vec<ActivityEntry>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            preferences: row.preferences.0,
            addresses: row.addresses.0,
            cart: row.cart.0,
            wishlist: row.wishlist,
            orders: row.orders,
            transactions: row.transactions.0,
            recent_activity: row.recent_activity.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

const SELECT_CUSTOMER: &str = r"
    SELECT id, user_id, phone, date_of_birth, preferences, addresses, cart, wishlist,
           orders, transactions, recent_activity, version, created_at, updated_at
    FROM customers
";

/// `PostgreSQL`-backed [`CustomerStore`].
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!("{SELECT_CUSTOMER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Customer::from))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let row =
            sqlx::query_as::<_, CustomerRow>(&format!("{SELECT_CUSTOMER} WHERE user_id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Customer::from))
    }

    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customers
                (id, user_id, phone, date_of_birth, preferences, addresses, cart, wishlist,
                 orders, transactions, recent_activity, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(customer.id)
        .bind(customer.user_id)
        .bind(customer.phone.as_deref())
        .bind(customer.date_of_birth)
        .bind(Json(&customer.preferences))
        .bind(Json(&customer.addresses))
        .bind(Json(&customer.cart))
        .bind(&customer.wishlist)
        .bind(&customer.orders)
        .bind(Json(&customer.transactions))
        .bind(Json(&customer.recent_activity))
        .bind(customer.version)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "customer profile already exists"))?;
        Ok(())
    }

    async fn update(&self, customer: &mut Customer) -> Result<(), RepositoryError> {
        let returned = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r"
            UPDATE customers
            SET phone = $3, date_of_birth = $4, preferences = $5, addresses = $6, cart = $7,
                wishlist = $8, orders = $9, transactions = $10, recent_activity = $11,
                version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING version, updated_at
            ",
        )
        .bind(customer.id)
        .bind(customer.version)
        .bind(customer.phone.as_deref())
        .bind(customer.date_of_birth)
        .bind(Json(&customer.preferences))
        .bind(Json(&customer.addresses))
        .bind(Json(&customer.cart))
        .bind(&customer.wishlist)
        .bind(&customer.orders)
        .bind(Json(&customer.transactions))
        .bind(Json(&customer.recent_activity))
        .fetch_optional(&self.pool)
        .await?;

        finish_update(
            &self.pool,
            "customers",
            customer.id.into(),
            returned,
            &mut customer.version,
            &mut customer.updated_at,
        )
        .await
    }

    async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected())
    }
}
