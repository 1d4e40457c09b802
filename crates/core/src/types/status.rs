//! Roles and status enums for marketplace records.

string_enum! {
    /// Account role. Decides which profile record a user owns.
    pub enum Role {
        Customer => "customer",
        Seller => "seller",
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Customer
    }
}

string_enum! {
    /// Order fulfillment status.
    pub enum OrderStatus {
        Pending => "pending",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    /// Whether the order can still be cancelled.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether a seller may move an order from `self` to `next`.
    ///
    /// Fulfillment only moves forward one step at a time; cancellation is
    /// allowed while the order has not shipped.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Pending | Self::Processing, Self::Cancelled)
        )
    }
}

string_enum! {
    /// Payment status of an order.
    pub enum PaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Refunded => "refunded",
    }
}

string_enum! {
    /// How the customer pays for an order.
    pub enum PaymentMethod {
        Card => "card",
        CashOnDelivery => "cash_on_delivery",
        Wallet => "wallet",
    }
}

impl PaymentMethod {
    /// Payment status an order starts with.
    ///
    /// Card and wallet payments are captured at checkout; cash is collected on delivery.
    #[must_use]
    pub const fn initial_status(&self) -> PaymentStatus {
        match self {
            Self::Card | Self::Wallet => PaymentStatus::Paid,
            Self::CashOnDelivery => PaymentStatus::Pending,
        }
    }
}

string_enum! {
    /// Product availability, derived from stock quantity.
    pub enum ProductStatus {
        Active => "active",
        LowStock => "low stock",
        OutOfStock => "out of stock",
    }
}

impl ProductStatus {
    /// Quantity at or below which a product is flagged as low stock.
    pub const LOW_STOCK_THRESHOLD: u32 = 5;

    /// Derive the status for a stock quantity.
    #[must_use]
    pub const fn for_quantity(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            q if q <= Self::LOW_STOCK_THRESHOLD => Self::LowStock,
            _ => Self::Active,
        }
    }
}

string_enum! {
    /// Seller account standing.
    pub enum SellerStatus {
        Pending => "pending",
        Active => "active",
        Suspended => "suspended",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!("seller".parse::<Role>(), Ok(Role::Seller));
        assert_eq!(Role::Customer.to_string(), "customer");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_product_status_for_quantity() {
        assert_eq!(ProductStatus::for_quantity(0), ProductStatus::OutOfStock);
        assert_eq!(ProductStatus::for_quantity(1), ProductStatus::LowStock);
        assert_eq!(ProductStatus::for_quantity(5), ProductStatus::LowStock);
        assert_eq!(ProductStatus::for_quantity(6), ProductStatus::Active);
    }

    #[test]
    fn test_product_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::LowStock).ok().as_deref(),
            Some("\"low stock\"")
        );
    }

    #[test]
    fn test_order_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Processing));
    }

    #[test]
    fn test_payment_initial_status() {
        assert_eq!(PaymentMethod::Card.initial_status(), PaymentStatus::Paid);
        assert_eq!(
            PaymentMethod::CashOnDelivery.initial_status(),
            PaymentStatus::Pending
        );
    }
}
