//! Checkout and order lifecycle.
//!
//! Placing an order stores the order first and then applies its side effects
//! one document at a time: stock on each product, sales metrics on each
//! seller, and history on the customer. There is no transaction across them.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vendora_core::{
    AddressId, OrderId, OrderStatus, PaymentMethod, ProductId, TransactionId, UserId,
};

use crate::db::{Database, RepositoryError};
use crate::models::{
    ActivityKind, AddressInput, Order, OrderItem, SessionClaims, TimelineStep,
    TransactionRecord,
};
use crate::services::customers::CustomerService;
use crate::services::error::{ServiceError, should_retry};
use crate::services::products::ProductService;
use crate::services::sellers::SellerService;

/// A requested order line.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Checkout request. Without `items` the whole cart is ordered.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub items: Option<Vec<LineRequest>>,
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<AddressInput>,
    pub payment_method: Option<PaymentMethod>,
}

/// An order with its progress steps.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub timeline: Vec<TimelineStep>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            timeline: order.timeline(),
            order,
        }
    }
}

/// Order operations.
pub struct OrderService<'a> {
    db: &'a Database,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Place an order for the calling customer.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the caller has no customer profile,
    /// `ServiceError::NotFound` for unknown requested products or addresses, and
    /// `ServiceError::Validation` for an empty order or missing payment method.
    pub async fn place(&self, caller: UserId, request: PlaceOrder) -> Result<Order, ServiceError> {
        let customer = self
            .db
            .customers()
            .find_by_user(caller)
            .await?
            .ok_or(ServiceError::Forbidden("only customers can place orders"))?;
        let method = request
            .payment_method
            .ok_or_else(|| ServiceError::invalid("paymentMethod is required"))?;

        let from_cart = request.items.is_none();
        let mut lines = match request.items {
            Some(items) => merge_lines(&items),
            None => customer
                .cart
                .iter()
                .map(|i| (i.product_id, i.quantity))
                .collect(),
        };
        let ids: Vec<ProductId> = lines.iter().map(|(id, _)| *id).collect();
        let products = if ids.is_empty() {
            Vec::new()
        } else {
            self.db.products().find_by_ids(&ids).await?
        };
        if from_cart {
            // Skip lines whose listing has since been deleted
            lines.retain(|(id, _)| products.iter().any(|p| p.id == *id));
        }
        if lines.is_empty() {
            return Err(ServiceError::invalid(if from_cart {
                "cart is empty"
            } else {
                "order must contain at least one item"
            }));
        }

        let shipping_address = match (request.address_id, request.shipping_address) {
            (Some(address_id), _) => customer
                .address(address_id)
                .cloned()
                .ok_or(ServiceError::NotFound("address"))?,
            (None, Some(input)) => input.into_address(AddressId::new())?,
            (None, None) => customer
                .default_address()
                .cloned()
                .ok_or_else(|| ServiceError::invalid("shipping address is required"))?,
        };

        let items = lines
            .iter()
            .map(|(product_id, quantity)| {
                let product = products
                    .iter()
                    .find(|p| p.id == *product_id)
                    .ok_or(ServiceError::NotFound("product"))?;
                Ok(OrderItem {
                    product_id: product.id,
                    seller_id: product.seller_id,
                    name: product.name.clone(),
                    image: product.primary_image().map(str::to_owned),
                    unit_price: product.unit_price(),
                    quantity: *quantity,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let order = Order::place(customer.id, items, shipping_address, method)?;
        self.db.orders().insert(&order).await?;
        tracing::info!(order_id = %order.id, customer_id = %customer.id, total = %order.pricing.total, "order placed");

        self.apply_stock(&order).await;
        self.apply_seller_metrics(&order).await;

        let transaction = TransactionRecord {
            id: order.payment.transaction_id.unwrap_or_else(TransactionId::new),
            order_id: order.id,
            amount: order.pricing.total,
            method,
            status: order.payment_status,
            created_at: order.created_at,
        };
        CustomerService::new(self.db)
            .update_with(customer.id, Some(caller), |c| {
                c.record_order(order.id, transaction.clone());
                c.remove_cart_lines(&ids);
                c.log_activity(
                    ActivityKind::Order,
                    format!("Placed order {} for {}", order.id, order.pricing.total),
                    Utc::now(),
                );
                Ok(())
            })
            .await?;

        Ok(order)
    }

    /// Load an order visible to the caller: the owning customer, or a seller
    /// with an item in it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn get(&self, id: OrderId, caller: &SessionClaims) -> Result<OrderView, ServiceError> {
        let order = self.find(id).await?;

        if let Some(customer) = self.db.customers().find_by_user(caller.sub).await?
            && customer.id == order.customer_id
        {
            return Ok(order.into());
        }
        if let Some(seller) = self.db.sellers().find_by_user(caller.sub).await?
            && order.involves_seller(seller.id)
        {
            return Ok(order.into());
        }
        Err(ServiceError::Forbidden("not your order"))
    }

    /// Cancel one of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` once the order has shipped.
    pub async fn cancel(&self, id: OrderId, caller: UserId) -> Result<Order, ServiceError> {
        let customer = self
            .db
            .customers()
            .find_by_user(caller)
            .await?
            .ok_or(ServiceError::Forbidden("not your order"))?;

        self.transition(id, OrderStatus::Cancelled, |order| {
            if order.customer_id != customer.id {
                return Err(ServiceError::Forbidden("not your order"));
            }
            if !order.status.is_cancellable() {
                return Err(ServiceError::invalid(format!(
                    "order cannot be cancelled once {}",
                    order.status
                )));
            }
            Ok(())
        })
        .await
    }

    /// Move an order to `next` after `authorize` accepts it, then mirror the
    /// payment status onto the customer's transaction record.
    pub(crate) async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
        authorize: impl Fn(&Order) -> Result<(), ServiceError> + Send + Sync,
    ) -> Result<Order, ServiceError> {
        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            let mut order = self.find(id).await?;
            authorize(&order)?;
            order.transition(next)?;
            match self.db.orders().update(&mut order).await {
                Ok(()) => break order,
                Err(e) if should_retry(&e, attempt) => {}
                Err(RepositoryError::NotFound) => return Err(ServiceError::NotFound("order")),
                Err(e) => return Err(e.into()),
            }
        };
        tracing::info!(order_id = %order.id, status = %order.status, "order status changed");

        let result = CustomerService::new(self.db)
            .update_with(order.customer_id, None, |c| {
                c.set_transaction_status(order.id, order.payment_status);
                c.log_activity(
                    ActivityKind::Order,
                    format!("Order {} is now {}", order.id, order.status),
                    Utc::now(),
                );
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(order_id = %order.id, error = %e, "failed to update customer history");
        }

        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.db
            .orders()
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }

    async fn apply_stock(&self, order: &Order) {
        let products = ProductService::new(self.db);
        for item in &order.items {
            let result = products
                .update_with(item.product_id, |p| {
                    p.decrement_stock(item.quantity);
                    Ok(())
                })
                .await;
            if let Err(e) = result {
                tracing::warn!(order_id = %order.id, product_id = %item.product_id, error = %e, "failed to decrement stock");
            }
        }
    }

    async fn apply_seller_metrics(&self, order: &Order) {
        let sellers = SellerService::new(self.db);
        for seller_id in order.seller_ids() {
            let amount = order.seller_subtotal(seller_id);
            let result = sellers
                .update_with(seller_id, None, |s| {
                    s.record_sale(amount);
                    Ok(())
                })
                .await;
            if let Err(e) = result {
                tracing::warn!(order_id = %order.id, %seller_id, error = %e, "failed to update seller metrics");
            }
        }
    }
}

/// Combine repeated products, keeping first-seen order and dropping zero quantities.
fn merge_lines(items: &[LineRequest]) -> Vec<(ProductId, u32)> {
    let mut order: Vec<ProductId> = Vec::new();
    let mut totals: HashMap<ProductId, u32> = HashMap::new();
    for line in items.iter().filter(|l| l.quantity > 0) {
        let total = totals.entry(line.product_id).or_insert_with(|| {
            order.push(line.product_id);
            0
        });
        *total = total.saturating_add(line.quantity);
    }
    order
        .into_iter()
        .filter_map(|id| totals.get(&id).map(|qty| (id, *qty)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Customer, Product, ProductDraft, Seller, SellerContact, SellerSettings, User};
    use vendora_core::{Email, Money, PaymentStatus, ProductStatus, Role};

    struct Fixture {
        db: Database,
        customer: Customer,
        seller: Seller,
        phone: Product,
    }

    fn shipping() -> AddressInput {
        AddressInput {
            full_name: "Ada".to_string(),
            phone: "555".to_string(),
            line1: "1 Way".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            postal_code: "73301".to_string(),
            country: "US".to_string(),
            ..AddressInput::default()
        }
    }

    async fn fixture() -> Fixture {
        let db = Database::memory();
        let user = User::new(
            "Ada".to_string(),
            Email::parse("ada@example.com").unwrap(),
            None,
            Role::Customer,
            None,
        );
        db.users().insert(&user).await.unwrap();
        let customer = Customer::new(user.id);
        db.customers().insert(&customer).await.unwrap();

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

        let draft: ProductDraft = serde_json::from_value(serde_json::json!({
            "name": "Phone",
            "description": "A phone",
            "brand": "Acme",
            "price": "60.00",
            "salePrice": "50.00",
            "quantity": 7,
        }))
        .unwrap();
        let phone = draft.into_product(seller.id).unwrap();
        db.products().insert(&phone).await.unwrap();

        Fixture {
            db,
            customer,
            seller,
            phone,
        }
    }

    fn claims(user_id: UserId, role: Role) -> SessionClaims {
        SessionClaims {
            sub: user_id,
            role,
            email: "x@example.com".to_string(),
            name: "X".to_string(),
            avatar: None,
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[tokio::test]
    async fn test_checkout_from_cart() {
        let f = fixture().await;
        CustomerService::new(&f.db)
            .set_cart_quantity(f.customer.id, f.customer.user_id, f.phone.id, 3)
            .await
            .unwrap();

        let order = OrderService::new(&f.db)
            .place(
                f.customer.user_id,
                PlaceOrder {
                    items: None,
                    address_id: None,
                    shipping_address: Some(shipping()),
                    payment_method: Some(PaymentMethod::Card),
                },
            )
            .await
            .unwrap();

        assert_eq!(order.pricing.subtotal, Money::parse("150.00").unwrap());
        assert_eq!(order.pricing.shipping, Money::ZERO);
        assert_eq!(order.pricing.tax, Money::parse("12.00").unwrap());
        assert_eq!(order.payment_status, PaymentStatus::Paid);

        let product = f.db.products().find_by_id(f.phone.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 4);
        assert_eq!(product.status, ProductStatus::LowStock);

        let customer = f.db.customers().find_by_id(f.customer.id).await.unwrap().unwrap();
        assert!(customer.cart.is_empty());
        assert_eq!(customer.orders, vec![order.id]);
        assert_eq!(customer.transactions.len(), 1);

        let seller = f.db.sellers().find_by_id(f.seller.id).await.unwrap().unwrap();
        assert_eq!(seller.metrics.total_orders, 1);
        assert_eq!(seller.metrics.total_sales, Money::parse("150.00").unwrap());
    }

    #[tokio::test]
    async fn test_empty_cart_and_missing_address() {
        let f = fixture().await;
        let service = OrderService::new(&f.db);

        let empty = service
            .place(
                f.customer.user_id,
                PlaceOrder {
                    items: None,
                    address_id: None,
                    shipping_address: Some(shipping()),
                    payment_method: Some(PaymentMethod::Card),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(empty.to_string(), "cart is empty");

        let no_address = service
            .place(
                f.customer.user_id,
                PlaceOrder {
                    items: Some(vec![LineRequest {
                        product_id: f.phone.id,
                        quantity: 1,
                    }]),
                    address_id: None,
                    shipping_address: None,
                    payment_method: Some(PaymentMethod::Card),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(no_address.to_string(), "shipping address is required");
    }

    #[tokio::test]
    async fn test_cancel_refunds_and_syncs_transaction() {
        let f = fixture().await;
        let service = OrderService::new(&f.db);
        let order = service
            .place(
                f.customer.user_id,
                PlaceOrder {
                    items: Some(vec![LineRequest {
                        product_id: f.phone.id,
                        quantity: 1,
                    }]),
                    address_id: None,
                    shipping_address: Some(shipping()),
                    payment_method: Some(PaymentMethod::Wallet),
                },
            )
            .await
            .unwrap();

        let cancelled = service.cancel(order.id, f.customer.user_id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

        let customer = f.db.customers().find_by_id(f.customer.id).await.unwrap().unwrap();
        assert_eq!(customer.transactions[0].status, PaymentStatus::Refunded);

        assert!(matches!(
            service.cancel(order.id, f.customer.user_id).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_order_visibility() {
        let f = fixture().await;
        let service = OrderService::new(&f.db);
        let order = service
            .place(
                f.customer.user_id,
                PlaceOrder {
                    items: Some(vec![LineRequest {
                        product_id: f.phone.id,
                        quantity: 1,
                    }]),
                    address_id: None,
                    shipping_address: Some(shipping()),
                    payment_method: Some(PaymentMethod::CashOnDelivery),
                },
            )
            .await
            .unwrap();

        let own = service
            .get(order.id, &claims(f.customer.user_id, Role::Customer))
            .await
            .unwrap();
        assert_eq!(own.timeline.len(), 4);
        assert!(
            service
                .get(order.id, &claims(f.seller.user_id, Role::Seller))
                .await
                .is_ok()
        );
        assert!(matches!(
            service
                .get(order.id, &claims(UserId::new(), Role::Customer))
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service
                .get(OrderId::new(), &claims(f.customer.user_id, Role::Customer))
                .await,
            Err(ServiceError::NotFound("order"))
        ));
    }

    #[test]
    fn test_merge_lines() {
        let a = ProductId::new();
        let b = ProductId::new();
        let merged = merge_lines(&[
            LineRequest { product_id: a, quantity: 1 },
            LineRequest { product_id: b, quantity: 0 },
            LineRequest { product_id: a, quantity: 2 },
        ]);
        assert_eq!(merged, vec![(a, 3)]);
    }
}
