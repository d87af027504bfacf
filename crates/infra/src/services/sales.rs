use std::sync::Arc;

use chrono::{DateTime, Utc};

use loomerp_core::{AggregateId, DomainError, DomainResult, LocationId, UserId};
use loomerp_inventory::{Reference, StockKey};
use loomerp_sales::{CancelEffect, NewOrderLine, Order, OrderId, OrderType};

use crate::docnum::DocumentSequence;
use crate::repository::InMemoryRepository;
use crate::stock_ledger::{LedgerAction, LedgerOp, StockLedger};

/// Sales order workflow: creation with reservation, confirmation,
/// fulfilment transitions, cancellation, deletion.
///
/// Every transition that moves stock runs inside the order repository's
/// write lock, so two commands racing on the same order serialize: the
/// loser sees the winner's status and fails its own transition check.
pub struct SalesService {
    ledger: Arc<StockLedger>,
    orders: Arc<InMemoryRepository<Order>>,
    sequence: Arc<DocumentSequence>,
}

impl SalesService {
    pub fn new(
        ledger: Arc<StockLedger>,
        orders: Arc<InMemoryRepository<Order>>,
        sequence: Arc<DocumentSequence>,
    ) -> Self {
        Self {
            ledger,
            orders,
            sequence,
        }
    }

    /// Create a Pending order and reserve stock for every line in one atomic
    /// batch. If any line cannot be reserved, no order exists afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn create_order(
        &self,
        customer: UserId,
        location: LocationId,
        order_type: OrderType,
        discount: u64,
        lines: &[NewOrderLine],
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Order> {
        let number = self.sequence.next("SO", now.date_naive());
        let order = Order::create(
            OrderId::new(AggregateId::new()),
            number,
            customer,
            location,
            order_type,
            discount,
            lines,
            created_by,
            now,
        )?;

        let batch = Self::line_batch(
            &order,
            LedgerAction::Reserve,
            created_by,
            format!("reservation for order {}", order.number()),
        );
        self.ledger.execute(&batch, now)?;
        self.orders.insert(order.clone())?;

        tracing::info!(
            "Created order {} with {} lines, total {}",
            order.number(),
            order.items().len(),
            order.total_amount()
        );
        Ok(order)
    }

    /// Confirm a Pending order: its reservations become actual deductions.
    pub fn confirm_order(&self, id: OrderId, now: DateTime<Utc>) -> DomainResult<Order> {
        let order = self.orders.update(&id, |order| {
            let mut next = order.clone();
            next.confirm(now)?;

            let batch = Self::line_batch(
                &next,
                LedgerAction::ConfirmSale,
                None,
                format!("sale confirmed for order {}", next.number()),
            );
            self.ledger.execute(&batch, now)?;
            *order = next.clone();
            Ok(next)
        })?;

        tracing::info!("Confirmed order {}", order.number());
        Ok(order)
    }

    pub fn ship_order(&self, id: OrderId, now: DateTime<Utc>) -> DomainResult<Order> {
        self.orders.update(&id, |order| {
            order.ship(now)?;
            Ok(order.clone())
        })
    }

    pub fn deliver_order(&self, id: OrderId, now: DateTime<Utc>) -> DomainResult<Order> {
        self.orders.update(&id, |order| {
            order.deliver(now)?;
            Ok(order.clone())
        })
    }

    /// Cancel an order. A Pending order gives its reservation back; a
    /// Confirmed order puts sold stock back on hand. Either reversal lands
    /// in the audit trail exactly once, however many cancels race.
    pub fn cancel_order(&self, id: OrderId, now: DateTime<Utc>) -> DomainResult<Order> {
        let order = self.orders.update(&id, |order| {
            let mut next = order.clone();
            let effect = next.cancel(now)?;

            let action: fn(i64) -> LedgerAction = match effect {
                CancelEffect::ReleaseReservation => LedgerAction::Release,
                CancelEffect::Restock => LedgerAction::Restock,
            };
            let batch = Self::line_batch(
                &next,
                action,
                None,
                format!("cancellation of order {}", next.number()),
            );
            self.ledger.execute(&batch, now)?;
            *order = next.clone();
            Ok(next)
        })?;

        tracing::info!("Cancelled order {}", order.number());
        Ok(order)
    }

    /// Delete a Pending or Cancelled order. A Pending order still holds its
    /// reservation, so deletion releases it first.
    pub fn delete_order(&self, id: OrderId, now: DateTime<Utc>) -> DomainResult<()> {
        let (order, ()) = self.orders.remove_if(&id, |order| {
            if !order.is_deletable() {
                return Err(DomainError::invalid_transition(
                    order.status().as_str(),
                    "deleted",
                ));
            }

            if order.holds_reservation() {
                let batch = Self::line_batch(
                    order,
                    LedgerAction::Release,
                    None,
                    format!("deletion of order {}", order.number()),
                );
                self.ledger.execute(&batch, now)?;
            }
            Ok(())
        })?;

        tracing::info!("Deleted order {}", order.number());
        Ok(())
    }

    pub fn order(&self, id: OrderId) -> DomainResult<Option<Order>> {
        self.orders.get(&id)
    }

    pub fn orders(&self) -> DomainResult<Vec<Order>> {
        let mut all = self.orders.all()?;
        all.sort_by_key(|o| o.created_at());
        Ok(all)
    }

    fn line_batch(
        order: &Order,
        action: impl Fn(i64) -> LedgerAction,
        performed_by: Option<UserId>,
        note: String,
    ) -> Vec<LedgerOp> {
        let reference = Reference::sales_order(order.id_typed().0);
        order
            .items()
            .iter()
            .map(|item| LedgerOp {
                key: StockKey::new(item.variant, order.location()),
                action: action(item.quantity),
                reference,
                performed_by,
                note: note.clone(),
            })
            .collect()
    }
}
