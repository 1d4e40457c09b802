//! Catalog browsing and seller listing management.

use vendora_core::{ProductId, UserId};

use crate::db::{Database, RepositoryError};
use crate::models::{Product, ProductDraft, ProductPage, ProductQuery, ProductUpdate, Seller};
use crate::services::error::{ServiceError, should_retry};
use crate::services::sellers::SellerService;

/// Product operations.
pub struct ProductService<'a> {
    db: &'a Database,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Filtered, paginated listing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ServiceError> {
        Ok(self.db.products().list(query).await?)
    }

    /// Load a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id.
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.db
            .products()
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// List a new product under the caller's store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the caller has no seller profile
    /// and `ServiceError::Validation` for an invalid draft.
    pub async fn create(&self, caller: UserId, draft: ProductDraft) -> Result<Product, ServiceError> {
        let seller = self.caller_store(caller).await?;
        let product = draft.into_product(seller.id)?;
        self.db.products().insert(&product).await?;

        self.adjust_product_count(&seller, true).await;
        tracing::info!(product_id = %product.id, seller_id = %seller.id, "product listed");
        Ok(product)
    }

    /// Change a product the caller's store owns.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, `ServiceError::Forbidden` or
    /// `ServiceError::Validation`.
    pub async fn update(
        &self,
        id: ProductId,
        caller: UserId,
        update: ProductUpdate,
    ) -> Result<Product, ServiceError> {
        let seller = self.caller_store(caller).await?;
        self.update_with(id, |p| {
            if p.seller_id != seller.id {
                return Err(ServiceError::Forbidden("not your product"));
            }
            Ok(update.clone().apply_to(p)?)
        })
        .await
    }

    /// Remove a product the caller's store owns.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn delete(&self, id: ProductId, caller: UserId) -> Result<(), ServiceError> {
        let seller = self.caller_store(caller).await?;
        let product = self.get(id).await?;
        if product.seller_id != seller.id {
            return Err(ServiceError::Forbidden("not your product"));
        }

        match self.db.products().delete(id).await {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        self.adjust_product_count(&seller, false).await;
        tracing::info!(product_id = %id, seller_id = %seller.id, "product removed");
        Ok(())
    }

    /// Read-modify-write a product, retrying stale writes. Status is
    /// recomputed before every write.
    pub(crate) async fn update_with(
        &self,
        id: ProductId,
        mut change: impl FnMut(&mut Product) -> Result<(), ServiceError> + Send,
    ) -> Result<Product, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut product = self.get(id).await?;
            change(&mut product)?;
            product.refresh_status();
            match self.db.products().update(&mut product).await {
                Ok(()) => return Ok(product),
                Err(e) if should_retry(&e, attempt) => {}
                Err(RepositoryError::NotFound) => return Err(ServiceError::NotFound("product")),
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn caller_store(&self, caller: UserId) -> Result<Seller, ServiceError> {
        self.db
            .sellers()
            .find_by_user(caller)
            .await?
            .ok_or(ServiceError::Forbidden("only sellers can manage products"))
    }

    async fn adjust_product_count(&self, seller: &Seller, listed: bool) {
        let result = SellerService::new(self.db)
            .update_with(seller.id, None, |s| {
                s.metrics.total_products = if listed {
                    s.metrics.total_products + 1
                } else {
                    s.metrics.total_products.saturating_sub(1)
                };
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(seller_id = %seller.id, error = %e, "failed to update product count");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{SellerContact, SellerSettings};
    use vendora_core::{Email, Money, ProductStatus};

    async fn seller(db: &Database) -> Seller {
        let seller = Seller::onboard(
            UserId::new(),
            SellerSettings {
                store_name: Some("Shop".to_string()),
                contact: Some(SellerContact {
                    email: Email::parse("shop@example.com").unwrap(),
                    phone: None,
                    website: None,
                }),
                ..SellerSettings::default()
            },
        )
        .unwrap();
        db.sellers().insert(&seller).await.unwrap();
        seller
    }

    fn draft(quantity: u32) -> ProductDraft {
        serde_json::from_value(serde_json::json!({
            "name": "Phone",
            "description": "A phone",
            "brand": "Acme",
            "price": "100.00",
            "quantity": quantity,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_counts_products() {
        let db = Database::memory();
        let seller = seller(&db).await;
        let service = ProductService::new(&db);

        let product = service.create(seller.user_id, draft(2)).await.unwrap();
        assert_eq!(product.status, ProductStatus::LowStock);

        let stored = db.sellers().find_by_id(seller.id).await.unwrap().unwrap();
        assert_eq!(stored.metrics.total_products, 1);

        service.delete(product.id, seller.user_id).await.unwrap();
        let stored = db.sellers().find_by_id(seller.id).await.unwrap().unwrap();
        assert_eq!(stored.metrics.total_products, 0);
        assert!(matches!(
            service.get(product.id).await,
            Err(ServiceError::NotFound("product"))
        ));
    }

    #[tokio::test]
    async fn test_non_seller_cannot_create() {
        let db = Database::memory();
        let err = ProductService::new(&db)
            .create(UserId::new(), draft(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_other_store_cannot_update() {
        let db = Database::memory();
        let owner = seller(&db).await;
        let other = seller(&db).await;
        let service = ProductService::new(&db);
        let product = service.create(owner.user_id, draft(10)).await.unwrap();

        let update = ProductUpdate {
            price: Some(Money::parse("1.00").unwrap()),
            ..ProductUpdate::default()
        };
        assert!(matches!(
            service.update(product.id, other.user_id, update).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
