//! End-to-end smoke binary: runs one trading day against the in-memory
//! stores and logs every step. Useful for eyeballing the ledger behavior
//! without a test harness.

use std::sync::Arc;

use chrono::{Duration, Utc};

use loomerp_core::{AggregateId, LocationId, UserId, VariantId};
use loomerp_infra::{
    DocumentSequence, InMemoryRepository, InventoryService, InvoicingService, PurchasingService,
    SalesService, StockLedger,
};
use loomerp_inventory::{StockKey, TransactionFilter};
use loomerp_invoicing::PaymentMethod;
use loomerp_purchasing::{GrnLine, SupplierId};
use loomerp_sales::{NewOrderLine, OrderType, VariantPrices};

fn main() -> anyhow::Result<()> {
    loomerp_observability::init();

    let ledger = Arc::new(StockLedger::new());
    let sequence = Arc::new(DocumentSequence::new());
    let orders = Arc::new(InMemoryRepository::new());

    let sales = SalesService::new(Arc::clone(&ledger), Arc::clone(&orders), Arc::clone(&sequence));
    let purchasing = PurchasingService::new(
        Arc::clone(&ledger),
        Arc::new(InMemoryRepository::new()),
        Arc::new(InMemoryRepository::new()),
        Arc::clone(&sequence),
    );
    let invoicing = InvoicingService::new(
        Arc::new(InMemoryRepository::new()),
        Arc::new(InMemoryRepository::new()),
        Arc::clone(&orders),
        Arc::clone(&sequence),
    );
    let inventory = InventoryService::new(Arc::clone(&ledger), Arc::new(InMemoryRepository::new()));

    let location = LocationId::new();
    let cotton_roll = VariantId::new();
    let supplier = SupplierId::new(AggregateId::new());
    let customer = UserId::new();
    let now = Utc::now();

    // Replenish: PO for 80 rolls, 75 accepted on delivery.
    let po = purchasing.create_purchase_order(
        supplier,
        location,
        &[(cotton_roll, 80, 850)],
        Some((now + Duration::days(7)).date_naive()),
        None,
        now,
    )?;
    purchasing.send_order(po.id_typed(), now)?;
    purchasing.confirm_order(po.id_typed(), supplier, now)?;
    purchasing.receive_goods(
        po.id_typed(),
        &[GrnLine {
            po_line_no: 1,
            quantity_received: 75,
            quantity_rejected: 5,
            remarks: "5 rolls water damaged".to_owned(),
        }],
        None,
        "",
        now,
    )?;

    // Sell: 30 rolls, confirmed and invoiced.
    let order = sales.create_order(
        customer,
        location,
        OrderType::Wholesale,
        0,
        &[NewOrderLine {
            variant: cotton_roll,
            quantity: 30,
            prices: VariantPrices {
                retail: 1_500,
                wholesale: 1_200,
                min_wholesale_qty: 20,
            },
        }],
        None,
        now,
    )?;
    sales.confirm_order(order.id_typed(), now)?;

    let invoice = invoicing.issue_invoice(
        order.id_typed(),
        (now + Duration::days(30)).date_naive(),
        now,
    )?;
    invoicing.record_payment(
        invoice.id_typed(),
        invoice.amount(),
        PaymentMethod::BankTransfer,
        "TXN-0001",
        now,
    )?;

    // Count correction and closing report.
    let key = StockKey::new(cotton_roll, location);
    inventory.adjust_stock(key, -2, "cycle count shortfall", None, now)?;

    let record = ledger.record(key)?.ok_or_else(loomerp_core::DomainError::not_found)?;
    let (replayed_qty, replayed_res) = ledger.replay(key)?;
    tracing::info!(
        "Closing stock for {}: on hand {}, reserved {}, available {} (audit replay: {}/{})",
        key,
        record.quantity(),
        record.reserved(),
        record.available(),
        replayed_qty,
        replayed_res
    );

    let trail = ledger.transactions(&TransactionFilter::for_key(key))?;
    for txn in &trail {
        tracing::info!(
            "  {:?} delta {:+} reserved {:+} ({})",
            txn.kind,
            txn.quantity_delta,
            txn.reserved_delta,
            txn.note
        );
    }

    Ok(())
}
