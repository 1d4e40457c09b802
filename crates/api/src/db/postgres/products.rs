//! Product listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use vendora_core::{
    Condition, Feature, Money, ProductId, ProductStatus, Ram, SellerId, Storage,
};

use super::{deleted, finish_update, from_db_quantity, to_db_quantity};
use crate::db::{ProductStore, RepositoryError};
use crate::models::{Product, ProductPage, ProductQuery};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    seller_id: SellerId,
    name: String,
    description: String,
    brand: String,
    model: Option<String>,
    price: Money,
    sale_price: Option<Money>,
    quantity: i32,
    storage: Option<Storage>,
    ram: Option<Ram>,
    condition: Condition,
    features: Vec<Feature>,
    images: Vec<String>,
    status: ProductStatus,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            seller_id: row.seller_id,
            name: row.name,
            description: row.description,
            brand: row.brand,
            model: row.model,
            price: row.price,
            sale_price: row.sale_price,
            quantity: from_db_quantity(row.quantity)?,
            storage: row.storage,
            ram: row.ram,
            condition: row.condition,
            features: row.features,
            images: row.images,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, seller_id, name, description, brand, model, price, \
    sale_price, quantity, storage, ram, condition, features, images, status, version, \
    created_at, updated_at";

/// Append the `WHERE` clause for a listing query.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE TRUE");

    if let Some(term) = query.search_term() {
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        builder
            .push(" AND (lower(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(brand) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(coalesce(model, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(seller_id) = query.seller_id {
        builder.push(" AND seller_id = ").push_bind(seller_id);
    }
    if let Some(brand) = query.brand_filter() {
        builder.push(" AND lower(brand) = lower(").push_bind(brand).push(")");
    }
    if let Some(condition) = query.condition {
        builder.push(" AND condition = ").push_bind(condition);
    }
    if let Some(storage) = query.storage {
        builder.push(" AND storage = ").push_bind(storage);
    }
    if let Some(ram) = query.ram {
        builder.push(" AND ram = ").push_bind(ram);
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(min) = query.min_price {
        builder
            .push(" AND coalesce(sale_price, price) >= ")
            .push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder
            .push(" AND coalesce(sale_price, price) <= ")
            .push_bind(max);
    }
}

/// `PostgreSQL`-backed [`ProductStore`].
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
    }

    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT count(*) FROM products");
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products"
        ));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(i64::from(query.per_page()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let items = select
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductPage {
            items,
            page: query.page(),
            per_page: query.per_page(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(product.id)
        .bind(product.seller_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(product.model.as_deref())
        .bind(product.price)
        .bind(product.sale_price)
        .bind(to_db_quantity(product.quantity)?)
        .bind(product.storage)
        .bind(product.ram)
        .bind(product.condition)
        .bind(&product.features)
        .bind(&product.images)
        .bind(product.status)
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, product: &mut Product) -> Result<(), RepositoryError> {
        let returned = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r"
            UPDATE products
            SET name = $3, description = $4, brand = $5, model = $6, price = $7,
                sale_price = $8, quantity = $9, storage = $10, ram = $11, condition = $12,
                features = $13, images = $14, status = $15,
                version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING version, updated_at
            ",
        )
        .bind(product.id)
        .bind(product.version)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(product.model.as_deref())
        .bind(product.price)
        .bind(product.sale_price)
        .bind(to_db_quantity(product.quantity)?)
        .bind(product.storage)
        .bind(product.ram)
        .bind(product.condition)
        .bind(&product.features)
        .bind(&product.images)
        .bind(product.status)
        .fetch_optional(&self.pool)
        .await?;

        finish_update(
            &self.pool,
            "products",
            product.id.into(),
            returned,
            &mut product.version,
            &mut product.updated_at,
        )
        .await
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected())
    }
}
