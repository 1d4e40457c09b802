//! Orders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use vendora_core::{CustomerId, OrderId, OrderStatus, PaymentStatus, SellerId};

use super::finish_update;
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Address, Order, OrderItem, OrderPricing, PaymentInfo};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    items: Json<Vec<OrderItem>>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    shipping_address: Json<Address>,
    pricing: Json<OrderPricing>,
    payment: Json<PaymentInfo>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            items: row.items.0,
            status: row.status,
            payment_status: row.payment_status,
            shipping_address: row.shipping_address.0,
            pricing: row.pricing.0,
            payment: row.payment.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

const SELECT_ORDER: &str = r"
    SELECT id, customer_id, items, status, payment_status, shipping_address, pricing,
           payment, version, created_at, updated_at
    FROM orders
";

/// `PostgreSQL`-backed [`OrderStore`].
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn list_for_seller(&self, seller_id: SellerId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE $1 = ANY(seller_ids) ORDER BY created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders
                (id, customer_id, seller_ids, items, status, payment_status, shipping_address,
                 pricing, payment, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.seller_ids())
        .bind(Json(&order.items))
        .bind(order.status)
        .bind(order.payment_status)
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.pricing))
        .bind(Json(&order.payment))
        .bind(order.version)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, order: &mut Order) -> Result<(), RepositoryError> {
        let returned = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r"
            UPDATE orders
            SET status = $3, payment_status = $4, payment = $5,
                version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING version, updated_at
            ",
        )
        .bind(order.id)
        .bind(order.version)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(Json(&order.payment))
        .fetch_optional(&self.pool)
        .await?;

        finish_update(
            &self.pool,
            "orders",
            order.id.into(),
            returned,
            &mut order.version,
            &mut order.updated_at,
        )
        .await
    }
}
