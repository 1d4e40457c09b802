//! In-process document store.
//!
//! Selected with `VENDORA_DATABASE_URL=memory:`. Data lives for the life of
//! the process. Enforces the same uniqueness and version rules as the
//! `PostgreSQL` stores so services behave identically on both.

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use vendora_core::{CustomerId, Email, OrderId, ProductId, SellerId, UserId};

use super::{
    CustomerStore, OrderStore, ProductStore, RepositoryError, SellerStore, UserStore,
};
use crate::models::{Customer, Order, Product, ProductPage, ProductQuery, Seller, User};

/// A stored document with an id and an optimistic version.
trait Document: Clone {
    type Id: Copy + Eq + Hash;

    fn id(&self) -> Self::Id;
    fn version(&self) -> i64;
    fn stamp(&mut self, version: i64, updated_at: DateTime<Utc>);
}

macro_rules! document {
    ($ty:ty, $id:ty) => {
        impl Document for $ty {
            type Id = $id;

            fn id(&self) -> $id {
                self.id
            }

            fn version(&self) -> i64 {
                self.version
            }

            fn stamp(&mut self, version: i64, updated_at: DateTime<Utc>) {
                self.version = version;
                self.updated_at = updated_at;
            }
        }
    };
}

document!(User, UserId);
document!(Customer, CustomerId);
document!(Seller, SellerId);
document!(Product, ProductId);
document!(Order, OrderId);

/// One collection of documents.
struct Collection<D: Document> {
    docs: RwLock<HashMap<D::Id, D>>,
}

impl<D: Document> Default for Collection<D> {
    fn default() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl<D: Document> Collection<D> {
    async fn get(&self, id: D::Id) -> Option<D> {
        self.docs.read().await.get(&id).cloned()
    }

    async fn find(&self, pred: impl Fn(&D) -> bool) -> Option<D> {
        self.docs.read().await.values().find(|d| pred(d)).cloned()
    }

    async fn filter(&self, pred: impl Fn(&D) -> bool) -> Vec<D> {
        self.docs
            .read()
            .await
            .values()
            .filter(|d| pred(d))
            .cloned()
            .collect()
    }

    /// Insert unless `clash` matches an existing document.
    async fn insert(
        &self,
        doc: &D,
        clash: impl Fn(&D) -> bool,
        conflict: &str,
    ) -> Result<(), RepositoryError> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&doc.id()) || docs.values().any(|d| clash(d)) {
            return Err(RepositoryError::Conflict(conflict.to_owned()));
        }
        docs.insert(doc.id(), doc.clone());
        Ok(())
    }

    async fn update(&self, doc: &mut D) -> Result<(), RepositoryError> {
        let mut docs = self.docs.write().await;
        let stored = docs.get_mut(&doc.id()).ok_or(RepositoryError::NotFound)?;
        if stored.version() != doc.version() {
            return Err(RepositoryError::Stale);
        }

        doc.stamp(doc.version() + 1, Utc::now());
        *stored = doc.clone();
        Ok(())
    }

    async fn delete(&self, id: D::Id) -> Result<(), RepositoryError> {
        self.docs
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// All collections held in memory.
#[derive(Default)]
pub struct MemoryStore {
    users: Collection<User>,
    customers: Collection<Customer>,
    sellers: Collection<Seller>,
    products: Collection<Product>,
    orders: Collection<Order>,
}

fn newest_first<D>(docs: &mut [D], created_at: impl Fn(&D) -> DateTime<Utc>) {
    docs.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(id).await)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.find(|u| &u.email == email).await)
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        self.users
            .insert(user, |u| u.email == user.email, "email already exists")
            .await
    }

    async fn update(&self, user: &mut User) -> Result<(), RepositoryError> {
        let taken = self
            .users
            .find(|u| u.email == user.email && u.id != user.id)
            .await;
        if taken.is_some() {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        self.users.update(user).await
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        self.users.delete(id).await
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customers.get(id).await)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customers.find(|c| c.user_id == user_id).await)
    }

    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        self.customers
            .insert(
                customer,
                |c| c.user_id == customer.user_id,
                "customer profile already exists",
            )
            .await
    }

    async fn update(&self, customer: &mut Customer) -> Result<(), RepositoryError> {
        self.customers.update(customer).await
    }

    async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        self.customers.delete(id).await
    }
}

#[async_trait]
impl SellerStore for MemoryStore {
    async fn find_by_id(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError> {
        Ok(self.sellers.get(id).await)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Seller>, RepositoryError> {
        Ok(self.sellers.find(|s| s.user_id == user_id).await)
    }

    async fn insert(&self, seller: &Seller) -> Result<(), RepositoryError> {
        self.sellers
            .insert(
                seller,
                |s| s.user_id == seller.user_id,
                "seller profile already exists",
            )
            .await
    }

    async fn update(&self, seller: &mut Seller) -> Result<(), RepositoryError> {
        self.sellers.update(seller).await
    }

    async fn delete(&self, id: SellerId) -> Result<(), RepositoryError> {
        self.sellers.delete(id).await
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.get(id).await)
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.filter(|p| ids.contains(&p.id)).await)
    }

    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let mut matching = self.products.filter(|p| query.matches(p)).await;
        newest_first(&mut matching, |p| p.created_at);

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.per_page() as usize)
            .collect();

        Ok(ProductPage {
            items,
            page: query.page(),
            per_page: query.per_page(),
            total,
        })
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        self.products
            .insert(product, |_| false, "product already exists")
            .await
    }

    async fn update(&self, product: &mut Product) -> Result<(), RepositoryError> {
        self.products.update(product).await
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.products.delete(id).await
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.get(id).await)
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.orders.filter(|o| o.customer_id == customer_id).await;
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn list_for_seller(&self, seller_id: SellerId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.orders.filter(|o| o.involves_seller(seller_id)).await;
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.orders.insert(order, |_| false, "order already exists").await
    }

    async fn update(&self, order: &mut Order) -> Result<(), RepositoryError> {
        self.orders.update(order).await
    }
}
