//! Seller profiles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use vendora_core::{SellerId, SellerStatus, UserId};

use super::{conflict_on_unique, deleted, finish_update};
use crate::db::{RepositoryError, SellerStore};
use crate::models::{
    BankDetails, BusinessAddress, Review, Seller, SellerContact, SellerMetrics, SellerPreferences,
};

#[derive(sqlx::FromRow)]
struct SellerRow {
    id: SellerId,
    user_id: UserId,
    store_name: String,
    store_description: Option<String>,
    logo_url: Option<String>,
    banner_url: Option<String>,
    contact: Json<SellerContact>,
    business_address: Option<Json<BusinessAddress>>,
    bank_details: Option<Json<BankDetails>>,
    status: SellerStatus,
    metrics: Json<SellerMetrics>,
    reviews: Json<Vec<Review>>,
    notification_preferences: Json<SellerPreferences>,
    business_categories: Vec<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SellerRow> for Seller {
    fn from(row: SellerRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            store_name: row.store_name,
            store_description: row.store_description,
            logo_url: row.logo_url,
            banner_url: row.banner_url,
            contact: row.contact.0,
            business_address: row.business_address.map(|j| j.0),
            bank_details: row.bank_details.map(|j| j.0),
            status: row.status,
            metrics: row.metrics.0,
            reviews: row.reviews.0,
            notification_preferences: row.notification_preferences.0,
            business_categories: row.business_categories,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

const SELECT_SELLER: &str = r"
    SELECT id, user_id, store_name, store_description, logo_url, banner_url, contact,
           business_address, bank_details, status, metrics, reviews,
           notification_preferences, business_categories, version, created_at, updated_at
    FROM sellers
";

/// `PostgreSQL`-backed [`SellerStore`].
pub struct PgSellerStore {
    pool: PgPool,
}

impl PgSellerStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SellerStore for PgSellerStore {
    async fn find_by_id(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError> {
        let row = sqlx::query_as::<_, SellerRow>(&format!("{SELECT_SELLER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Seller::from))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Seller>, RepositoryError> {
        let row = sqlx::query_as::<_, SellerRow>(&format!("{SELECT_SELLER} WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Seller::from))
    }

    async fn insert(&self, seller: &Seller) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sellers
                (id, user_id, store_name, store_description, logo_url, banner_url, contact,
                 business_address, bank_details, status, metrics, reviews,
                 notification_preferences, business_categories, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ",
        )
        .bind(seller.id)
        .bind(seller.user_id)
        .bind(&seller.store_name)
        .bind(seller.store_description.as_deref())
        .bind(seller.logo_url.as_deref())
        .bind(seller.banner_url.as_deref())
        .bind(Json(&seller.contact))
        .bind(seller.business_address.as_ref().map(Json))
        .bind(seller.bank_details.as_ref().map(Json))
        .bind(seller.status)
        .bind(Json(&seller.metrics))
        .bind(Json(&seller.reviews))
        .bind(Json(&seller.notification_preferences))
        .bind(&seller.business_categories)
        .bind(seller.version)
        .bind(seller.created_at)
        .bind(seller.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "seller profile already exists"))?;
        Ok(())
    }

    async fn update(&self, seller: &mut Seller) -> Result<(), RepositoryError> {
        let returned = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r"
            UPDATE sellers
            SET store_name = $3, store_description = $4, logo_url = $5, banner_url = $6,
                contact = $7, business_address = $8, bank_details = $9, status = $10,
                metrics = $11, reviews = $12, notification_preferences = $13,
                business_categories = $14, version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING version, updated_at
            ",
        )
        .bind(seller.id)
        .bind(seller.version)
        .bind(&seller.store_name)
        .bind(seller.store_description.as_deref())
        .bind(seller.logo_url.as_deref())
        .bind(seller.banner_url.as_deref())
        .bind(Json(&seller.contact))
        .bind(seller.business_address.as_ref().map(Json))
        .bind(seller.bank_details.as_ref().map(Json))
        .bind(seller.status)
        .bind(Json(&seller.metrics))
        .bind(Json(&seller.reviews))
        .bind(Json(&seller.notification_preferences))
        .bind(&seller.business_categories)
        .fetch_optional(&self.pool)
        .await?;

        finish_update(
            &self.pool,
            "sellers",
            seller.id.into(),
            returned,
            &mut seller.version,
            &mut seller.updated_at,
        )
        .await
    }

    async fn delete(&self, id: SellerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM sellers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected())
    }
}
