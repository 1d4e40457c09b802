//! Seller onboarding, storefront settings, reviews and order handling.

use serde::Deserialize;

use vendora_core::{OrderId, OrderStatus, Role, SellerId, UserId};

use crate::db::{Database, RepositoryError};
use crate::models::{Order, ProductPage, ProductQuery, Review, Seller, SellerSettings, User};
use crate::services::auth::AuthService;
use crate::services::error::{ServiceError, should_retry};
use crate::services::orders::OrderService;

/// A review submitted by a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub rating: u8,
    pub comment: Option<String>,
}

/// Seller operations.
pub struct SellerService<'a> {
    db: &'a Database,
}

impl<'a> SellerService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a seller profile for `user_id` and switch the user to the seller
    /// role.
    ///
    /// If the role change fails the new profile is deleted again. An existing
    /// customer profile is kept.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the user already has a seller profile.
    /// Returns `ServiceError::Validation` for an incomplete form.
    pub async fn onboard(
        &self,
        user_id: UserId,
        form: SellerSettings,
    ) -> Result<(Seller, User), ServiceError> {
        if self.db.sellers().find_by_user(user_id).await?.is_some() {
            return Err(ServiceError::Conflict("seller profile already exists".to_owned()));
        }

        let seller = Seller::onboard(user_id, form)?;
        self.db.sellers().insert(&seller).await.map_err(|e| match e {
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            other => other.into(),
        })?;

        match AuthService::new(self.db).set_role(user_id, Role::Seller).await {
            Ok(user) => {
                tracing::info!(%user_id, seller_id = %seller.id, "seller onboarded");
                Ok((seller, user))
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "role update failed, removing seller profile");
                if let Err(cleanup) = self.db.sellers().delete(seller.id).await {
                    tracing::error!(seller_id = %seller.id, error = %cleanup, "failed to remove seller profile");
                }
                Err(ServiceError::RolledBack("seller onboarding failed"))
            }
        }
    }

    /// Load a seller by id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id.
    pub async fn get(&self, id: SellerId) -> Result<Seller, ServiceError> {
        self.db
            .sellers()
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("seller"))
    }

    /// Load a seller the caller owns.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id and
    /// `ServiceError::Forbidden` when the caller is not the owner.
    pub async fn get_owned(&self, id: SellerId, caller: UserId) -> Result<Seller, ServiceError> {
        let seller = self.get(id).await?;
        if seller.user_id != caller {
            return Err(ServiceError::Forbidden("not your store"));
        }
        Ok(seller)
    }

    /// The caller's seller profile.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the caller has no seller profile.
    pub async fn for_user(&self, user_id: UserId) -> Result<Seller, ServiceError> {
        self.db
            .sellers()
            .find_by_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound("seller"))
    }

    /// Apply a settings patch.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the patch is incomplete.
    pub async fn update_settings(
        &self,
        id: SellerId,
        caller: UserId,
        settings: SellerSettings,
    ) -> Result<Seller, ServiceError> {
        self.update_with(id, Some(caller), |s| Ok(s.apply(settings.clone())?))
            .await
    }

    /// A store's listings.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown seller.
    pub async fn products(
        &self,
        id: SellerId,
        mut query: ProductQuery,
    ) -> Result<ProductPage, ServiceError> {
        let seller = self.get(id).await?;
        query.seller_id = Some(seller.id);
        Ok(self.db.products().list(&query).await?)
    }

    /// Orders containing the store's products.
    ///
    /// # Errors
    ///
    /// See [`Self::get_owned`].
    pub async fn orders(&self, id: SellerId, caller: UserId) -> Result<Vec<Order>, ServiceError> {
        let seller = self.get_owned(id, caller).await?;
        Ok(self.db.orders().list_for_seller(seller.id).await?)
    }

    /// Move one of the store's orders to a new status.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the order has no item from this
    /// store and `ServiceError::Validation` for a disallowed move.
    pub async fn update_order_status(
        &self,
        id: SellerId,
        caller: UserId,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let seller = self.get_owned(id, caller).await?;
        OrderService::new(self.db)
            .transition(order_id, status, |order| {
                if order.involves_seller(seller.id) {
                    Ok(())
                } else {
                    Err(ServiceError::Forbidden("order has no items from this store"))
                }
            })
            .await
    }

    /// Leave a review on a store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the caller has no customer profile
    /// and `ServiceError::Validation` for a rating outside 1 to 5.
    pub async fn add_review(
        &self,
        id: SellerId,
        caller: UserId,
        input: ReviewInput,
    ) -> Result<Review, ServiceError> {
        let customer = self
            .db
            .customers()
            .find_by_user(caller)
            .await?
            .ok_or(ServiceError::Forbidden("only customers can leave reviews"))?;

        let mut review = None;
        self.update_with(id, None, |s| {
            let added = s.add_review(customer.id, input.rating, input.comment.as_deref())?;
            review = Some(added.clone());
            Ok(())
        })
        .await?;

        review.ok_or(ServiceError::NotFound("review"))
    }

    /// Read-modify-write a seller, retrying stale writes. When `owner` is given
    /// the seller must belong to that user.
    pub(crate) async fn update_with(
        &self,
        id: SellerId,
        owner: Option<UserId>,
        mut change: impl FnMut(&mut Seller) -> Result<(), ServiceError> + Send,
    ) -> Result<Seller, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut seller = match owner {
                Some(caller) => self.get_owned(id, caller).await?,
                None => self.get(id).await?,
            };
            change(&mut seller)?;
            match self.db.sellers().update(&mut seller).await {
                Ok(()) => return Ok(seller),
                Err(e) if should_retry(&e, attempt) => {}
                Err(RepositoryError::NotFound) => return Err(ServiceError::NotFound("seller")),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
