//! Orders, checkout pricing and status moves.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendora_core::{
    CustomerId, Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, SellerId,
    TransactionId,
};

use super::{Address, ValidationError};

/// Subtotal, in cents, at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD_CENTS: u32 = 10_000;
/// Flat shipping fee, in cents, below the threshold.
pub const FLAT_SHIPPING_CENTS: u32 = 999;
/// Sales tax, in percent of the subtotal.
pub const TAX_PERCENT: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Snapshot of a purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    fn checked_line_total(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Price breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricing {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderPricing {
    /// Price a set of lines.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the total would exceed [`Money::MAX`].
    pub fn for_items(items: &[OrderItem]) -> Result<Self, ValidationError> {
        let too_large = || ValidationError("order total is too large".to_string());
        let subtotal = items.iter().try_fold(Money::ZERO, |acc, item| {
            item.checked_line_total()
                .and_then(|line| acc.checked_add(line))
                .ok_or_else(too_large)
        })?;
        let shipping = if subtotal >= Money::from_cents(FREE_SHIPPING_THRESHOLD_CENTS) {
            Money::ZERO
        } else {
            Money::from_cents(FLAT_SHIPPING_CENTS)
        };
        let tax = subtotal.percent(TAX_PERCENT);
        let total = subtotal
            .checked_add(shipping)
            .and_then(|t| t.checked_add(tax))
            .ok_or_else(too_large)?;

        Ok(Self {
            subtotal,
            shipping,
            tax,
            total,
        })
    }
}

/// How the order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub transaction_id: Option<TransactionId>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// One step of the customer-facing progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub step: &'static str,
    pub completed: bool,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Address,
    pub pricing: OrderPricing,
    pub payment: PaymentInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
}

impl Order {
    /// Price and open a new order.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when `items` is empty or a line has zero quantity.
    pub fn place(
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        shipping_address: Address,
        method: PaymentMethod,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError("order must contain at least one item".to_string()));
        }
        if items.iter().any(|i| i.quantity == 0) {
            return Err(ValidationError("item quantity must be at least 1".to_string()));
        }

        let pricing = OrderPricing::for_items(&items)?;
        let now = Utc::now();
        let payment_status = method.initial_status();
        Ok(Self {
            id: OrderId::new(),
            customer_id,
            pricing,
            items,
            status: OrderStatus::Pending,
            payment_status,
            shipping_address,
            payment: PaymentInfo {
                method,
                transaction_id: Some(TransactionId::new()),
                paid_at: (payment_status == PaymentStatus::Paid).then_some(now),
            },
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Distinct sellers with at least one line in the order.
    #[must_use]
    pub fn seller_ids(&self) -> Vec<SellerId> {
        let mut ids: Vec<SellerId> = Vec::new();
        for item in &self.items {
            if !ids.contains(&item.seller_id) {
                ids.push(item.seller_id);
            }
        }
        ids
    }

    /// Whether `seller_id` sold anything in this order.
    #[must_use]
    pub fn involves_seller(&self, seller_id: SellerId) -> bool {
        self.items.iter().any(|i| i.seller_id == seller_id)
    }

    /// Sum of the lines sold by `seller_id`.
    #[must_use]
    pub fn seller_subtotal(&self, seller_id: SellerId) -> Money {
        self.items
            .iter()
            .filter(|i| i.seller_id == seller_id)
            .map(OrderItem::line_total)
            .sum()
    }

    /// Move the order to `next`.
    ///
    /// Cancelling a paid order marks the payment refunded.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the move is not allowed from the current status.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError(format!(
                "cannot change order status from {} to {next}",
                self.status
            )));
        }

        self.status = next;
        if next == OrderStatus::Cancelled && self.payment_status == PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Refunded;
        }
        Ok(())
    }

    /// Progress steps for display.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineStep> {
        if self.status == OrderStatus::Cancelled {
            return vec![
                TimelineStep { step: "ordered", completed: true },
                TimelineStep { step: "cancelled", completed: true },
            ];
        }

        let reached = match self.status {
            OrderStatus::Pending | OrderStatus::Cancelled => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
        };
        ["ordered", "processing", "shipped", "delivered"]
            .into_iter()
            .enumerate()
            .map(|(i, step)| TimelineStep {
                step,
                completed: i <= reached,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::AddressInput;
    use vendora_core::AddressId;

    fn item(seller_id: SellerId, price: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(),
            seller_id,
            name: "Phone".to_string(),
            image: None,
            unit_price: Money::parse(price).unwrap(),
            quantity,
        }
    }

    fn address() -> Address {
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
        .into_address(AddressId::new())
        .unwrap()
    }

    fn order(method: PaymentMethod) -> Order {
        Order::place(
            CustomerId::new(),
            vec![item(SellerId::new(), "20.00", 2)],
            address(),
            method,
        )
        .unwrap()
    }

    #[test]
    fn test_pricing_below_free_shipping() {
        let pricing = OrderPricing::for_items(&[item(SellerId::new(), "10.25", 1)]).unwrap();
        assert_eq!(pricing.subtotal, Money::parse("10.25").unwrap());
        assert_eq!(pricing.shipping, Money::parse("9.99").unwrap());
        assert_eq!(pricing.tax, Money::parse("0.82").unwrap());
        assert_eq!(pricing.total, Money::parse("21.06").unwrap());
    }

    #[test]
    fn test_pricing_free_shipping_at_threshold() {
        let pricing = OrderPricing::for_items(&[item(SellerId::new(), "50.00", 2)]).unwrap();
        assert_eq!(pricing.shipping, Money::ZERO);
        assert_eq!(pricing.tax, Money::parse("8.00").unwrap());
        assert_eq!(pricing.total, Money::parse("108.00").unwrap());
    }

    #[test]
    fn test_pricing_rejects_total_past_max() {
        let seller = SellerId::new();
        assert!(OrderPricing::for_items(&[item(seller, "9999999999.99", 2)]).is_err());
        // Subtotal fits but tax pushes the total over
        assert!(OrderPricing::for_items(&[item(seller, "9999999999.00", 1)]).is_err());
    }

    #[test]
    fn test_place_rejects_empty_and_zero_quantity() {
        assert!(Order::place(CustomerId::new(), vec![], address(), PaymentMethod::Card).is_err());
        assert!(
            Order::place(
                CustomerId::new(),
                vec![item(SellerId::new(), "1.00", 0)],
                address(),
                PaymentMethod::Card
            )
            .is_err()
        );
    }

    #[test]
    fn test_payment_status_follows_method() {
        let card = order(PaymentMethod::Card);
        assert_eq!(card.payment_status, PaymentStatus::Paid);
        assert!(card.payment.paid_at.is_some());

        let cod = order(PaymentMethod::CashOnDelivery);
        assert_eq!(cod.payment_status, PaymentStatus::Pending);
        assert!(cod.payment.paid_at.is_none());
    }

    #[test]
    fn test_cancel_paid_order_refunds() {
        let mut paid = order(PaymentMethod::Card);
        paid.transition(OrderStatus::Cancelled).unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Refunded);

        let mut cod = order(PaymentMethod::CashOnDelivery);
        cod.transition(OrderStatus::Cancelled).unwrap();
        assert_eq!(cod.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_transition_rules() {
        let mut order = order(PaymentMethod::Card);
        assert!(order.transition(OrderStatus::Shipped).is_err());
        order.transition(OrderStatus::Processing).unwrap();
        order.transition(OrderStatus::Shipped).unwrap();
        assert!(order.transition(OrderStatus::Cancelled).is_err());
        order.transition(OrderStatus::Delivered).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_timeline() {
        let mut order = order(PaymentMethod::Card);
        order.transition(OrderStatus::Processing).unwrap();
        let steps: Vec<_> = order.timeline().into_iter().map(|s| s.completed).collect();
        assert_eq!(steps, vec![true, true, false, false]);

        order.transition(OrderStatus::Cancelled).unwrap();
        let timeline = order.timeline();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[1].step, "cancelled");
    }

    #[test]
    fn test_seller_breakdown() {
        let a = SellerId::new();
        let b = SellerId::new();
        let order = Order::place(
            CustomerId::new(),
            vec![item(a, "5.00", 2), item(b, "3.00", 1), item(a, "1.00", 1)],
            address(),
            PaymentMethod::Wallet,
        )
        .unwrap();

        assert_eq!(order.seller_ids(), vec![a, b]);
        assert_eq!(order.seller_subtotal(a), Money::parse("11.00").unwrap());
        assert!(!order.involves_seller(SellerId::new()));
    }
}
