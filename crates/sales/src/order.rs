use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomerp_core::{AggregateId, DomainError, DomainResult, Entity, LocationId, UserId, VariantId};

/// Sales order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Retail vs wholesale determines which catalog price gets frozen into the
/// order lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Retail,
    Wholesale,
}

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived payment state, driven by invoicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

/// Catalog price snapshot for one variant, captured at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPrices {
    /// Prices in smallest currency unit (e.g., cents).
    pub retail: u64,
    pub wholesale: u64,
    /// Minimum line quantity for wholesale orders.
    pub min_wholesale_qty: i64,
}

impl VariantPrices {
    pub fn unit_price_for(&self, order_type: OrderType) -> u64 {
        match order_type {
            OrderType::Retail => self.retail,
            OrderType::Wholesale => self.wholesale,
        }
    }
}

/// Requested line at creation time: what the caller asks for, before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub variant: VariantId,
    pub quantity: i64,
    pub prices: VariantPrices,
}

/// Order line with the unit price frozen at creation; the catalog may change
/// later, the line does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub variant: VariantId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl OrderItem {
    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(self.quantity as u64)
    }
}

/// Which ledger reversal a cancellation requires, decided by the status the
/// order held when it was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelEffect {
    /// Was Pending: only the reservation is released.
    ReleaseReservation,
    /// Was Confirmed: sold quantity comes back and the (already released)
    /// reservation is cleaned up.
    Restock,
}

/// Sales order: customer, fulfillment location, frozen-price lines, totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    number: String,
    customer: UserId,
    location: LocationId,
    order_type: OrderType,
    status: OrderStatus,
    items: Vec<OrderItem>,
    /// Amounts in smallest currency unit.
    subtotal: u64,
    discount: u64,
    total_amount: u64,
    payment_status: PaymentStatus,
    created_by: Option<UserId>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a Pending order from requested lines, freezing unit prices per
    /// the order type. Availability is the ledger's concern, not this
    /// constructor's.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: OrderId,
        number: impl Into<String>,
        customer: UserId,
        location: LocationId,
        order_type: OrderType,
        discount: u64,
        lines: &[NewOrderLine],
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must have at least one line"));
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            if order_type == OrderType::Wholesale && line.quantity < line.prices.min_wholesale_qty {
                return Err(DomainError::validation(format!(
                    "minimum wholesale quantity for variant {} is {}",
                    line.variant, line.prices.min_wholesale_qty
                )));
            }
            items.push(OrderItem {
                variant: line.variant,
                quantity: line.quantity,
                unit_price: line.prices.unit_price_for(order_type),
            });
        }

        let subtotal = items
            .iter()
            .try_fold(0u64, |acc, item| acc.checked_add(item.line_total()))
            .ok_or_else(|| DomainError::validation("order subtotal overflow"))?;

        if discount > subtotal {
            return Err(DomainError::validation(
                "discount cannot exceed order subtotal",
            ));
        }

        Ok(Self {
            id,
            number: number.into(),
            customer,
            location,
            order_type,
            status: OrderStatus::Pending,
            items,
            subtotal,
            discount,
            total_amount: subtotal - discount,
            payment_status: PaymentStatus::Pending,
            created_by,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn customer(&self) -> UserId {
        self.customer
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn discount(&self) -> u64 {
        self.discount
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != from {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Pending -> Confirmed. The caller must have executed the matching
    /// `confirm_sale` ledger batch in the same atomic unit.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Pending, OrderStatus::Confirmed, now)
    }

    /// Confirmed -> Shipped. No ledger effect.
    pub fn ship(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Confirmed, OrderStatus::Shipped, now)
    }

    /// Shipped -> Delivered. No ledger effect.
    pub fn deliver(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Shipped, OrderStatus::Delivered, now)
    }

    /// Pending | Confirmed -> Cancelled. Returns which ledger reversal the
    /// caller must execute.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<CancelEffect> {
        let effect = match self.status {
            OrderStatus::Pending => CancelEffect::ReleaseReservation,
            OrderStatus::Confirmed => CancelEffect::Restock,
            other => {
                return Err(DomainError::invalid_transition(
                    other.as_str(),
                    OrderStatus::Cancelled.as_str(),
                ));
            }
        };
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
        Ok(effect)
    }

    /// Only Pending and Cancelled orders may be deleted; everything past the
    /// ledger commit is audit-immutable.
    pub fn is_deletable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Cancelled)
    }

    /// Whether deleting this order must release reservations first.
    pub fn holds_reservation(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn set_payment_status(&mut self, payment_status: PaymentStatus, now: DateTime<Utc>) {
        self.payment_status = payment_status;
        self.updated_at = now;
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomerp_core::AggregateId;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_prices() -> VariantPrices {
        VariantPrices {
            retail: 1500,
            wholesale: 1100,
            min_wholesale_qty: 10,
        }
    }

    fn test_lines(quantity: i64) -> Vec<NewOrderLine> {
        vec![NewOrderLine {
            variant: VariantId::new(),
            quantity,
            prices: test_prices(),
        }]
    }

    fn pending_order() -> Order {
        Order::create(
            test_order_id(),
            "SO-20260830-0001",
            UserId::new(),
            LocationId::new(),
            OrderType::Retail,
            0,
            &test_lines(2),
            None,
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn create_freezes_retail_price_and_computes_totals() {
        let order = Order::create(
            test_order_id(),
            "SO-20260830-0001",
            UserId::new(),
            LocationId::new(),
            OrderType::Retail,
            500,
            &test_lines(2),
            None,
            test_time(),
        )
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.items()[0].unit_price, 1500);
        assert_eq!(order.subtotal(), 3000);
        assert_eq!(order.total_amount(), 2500);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn wholesale_uses_wholesale_price_and_minimum_quantity() {
        let err = Order::create(
            test_order_id(),
            "SO-20260830-0002",
            UserId::new(),
            LocationId::new(),
            OrderType::Wholesale,
            0,
            &test_lines(5),
            None,
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let order = Order::create(
            test_order_id(),
            "SO-20260830-0003",
            UserId::new(),
            LocationId::new(),
            OrderType::Wholesale,
            0,
            &test_lines(10),
            None,
            test_time(),
        )
        .unwrap();
        assert_eq!(order.items()[0].unit_price, 1100);
        assert_eq!(order.subtotal(), 11_000);
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let err = Order::create(
            test_order_id(),
            "SO-20260830-0004",
            UserId::new(),
            LocationId::new(),
            OrderType::Retail,
            99_999,
            &test_lines(1),
            None,
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_orders_are_rejected() {
        let err = Order::create(
            test_order_id(),
            "SO-20260830-0005",
            UserId::new(),
            LocationId::new(),
            OrderType::Retail,
            0,
            &[],
            None,
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn lifecycle_pending_to_delivered() {
        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        order.ship(test_time()).unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        order.deliver(test_time()).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut order = pending_order();
        let err = order.ship(test_time()).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, to } => {
                assert_eq!(from, "pending");
                assert_eq!(to, "shipped");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        let mut order = pending_order();
        assert!(order.deliver(test_time()).is_err());
        assert!(order.confirm(test_time()).is_ok());
        assert!(order.deliver(test_time()).is_err());
    }

    #[test]
    fn cancel_effect_depends_on_prior_status() {
        let mut order = pending_order();
        assert_eq!(
            order.cancel(test_time()).unwrap(),
            CancelEffect::ReleaseReservation
        );
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        assert_eq!(order.cancel(test_time()).unwrap(), CancelEffect::Restock);
    }

    #[test]
    fn terminal_states_cannot_be_cancelled() {
        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        order.ship(test_time()).unwrap();
        assert!(order.cancel(test_time()).is_err());

        order.deliver(test_time()).unwrap();
        assert!(order.cancel(test_time()).is_err());
    }

    #[test]
    fn deletability_follows_status() {
        let mut order = pending_order();
        assert!(order.is_deletable());
        assert!(order.holds_reservation());

        order.cancel(test_time()).unwrap();
        assert!(order.is_deletable());
        assert!(!order.holds_reservation());

        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        assert!(!order.is_deletable());
    }
}
