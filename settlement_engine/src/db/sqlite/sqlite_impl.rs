//! `SqliteDatabase` is the SQLite backend of the settlement engine.
//!
//! It implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqliteConnection, SqlitePool};

use super::{
    carts,
    db_url,
    new_pool,
    orders,
    payouts,
    products,
    treasury,
    unit_of_work::{detect_mode, UnitOfWork},
};
use crate::{
    db_types::{
        NewOrder,
        NewPayout,
        NewProduct,
        NewTrackingEntry,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Payout,
        PayoutStatus,
        PayoutType,
        Product,
        SettlementMode,
        TrackingEntry,
        Treasury,
    },
    engine_api::{
        errors::{CartError, SettlementError},
        settlement_objects::{AppliedSettlement, SettlementBreakdown, SettlementOutcome, SettlementStep, StockChange},
    },
    traits::{
        CartManagement,
        CatalogManagement,
        InsertOrderResult,
        InsertPayoutResult,
        OrderManagement,
        SettlementDatabase,
        TreasuryManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    mode: SettlementMode,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?}, {} settlements)", self.pool, self.mode)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `MKT_DATABASE_URL`, or the default location.
    pub async fn new(max_connections: u32, mode: SettlementMode) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_mode(&url, max_connections, mode).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        SqliteDatabase::new_with_mode(url, max_connections, SettlementMode::Atomic).await
    }

    /// Connects to the database and checks that the requested settlement mode is available, downgrading to
    /// sequential settlements if it is not.
    pub async fn new_with_mode(url: &str, max_connections: u32, mode: SettlementMode) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        let mode = detect_mode(&pool, mode).await;
        Ok(Self { url: url.to_string(), pool, mode })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

/// Steps 1 to 5 of a settlement. Returns `None` if the order turned out to be paid already. Each step that finishes is
/// pushed onto `completed`.
async fn settlement_steps(
    conn: &mut SqliteConnection,
    order: &Order,
    items: &[OrderItem],
    breakdown: &SettlementBreakdown,
    mode: SettlementMode,
    completed: &mut Vec<SettlementStep>,
) -> Result<Option<AppliedSettlement>, SettlementError> {
    let paid = match orders::mark_paid(order.id, conn).await? {
        Some(o) => o,
        None => return Ok(None),
    };
    let entry = NewTrackingEntry::new(
        paid.status,
        "Payment confirmed",
        format!("Payment of {} has been confirmed.", paid.total_price),
    );
    orders::append_tracking_entry(&paid.order_id, entry, conn).await?;
    completed.push(SettlementStep::MarkPaid);
    trace!("🗃️ Order {} marked as paid", paid.order_id);

    let mut stock_changes = Vec::with_capacity(items.len());
    for item in items {
        let stock_after = products::decrement_stock(&item.product_id, item.quantity, conn).await?;
        if stock_after.is_none() {
            warn!(
                "🗃️ Product {} in order {} no longer exists. Its stock adjustment is skipped.",
                item.product_id, paid.order_id
            );
        }
        stock_changes.push(StockChange { product_id: item.product_id.clone(), quantity: item.quantity, stock_after });
    }
    completed.push(SettlementStep::ReduceStock);

    let treasury =
        treasury::credit_settlement(breakdown.seller_amount, breakdown.shipping_cost, breakdown.admin_fee, conn)
            .await?;
    completed.push(SettlementStep::CreditTreasury);
    trace!("🗃️ Treasury credited for order {}", paid.order_id);

    let payout = match &paid.store_id {
        Some(store_id) => {
            let new_payout = NewPayout {
                store_id: store_id.clone(),
                order_id: Some(paid.order_id.clone()),
                amount: breakdown.seller_amount,
                payout_type: PayoutType::OrderPayment,
                breakdown: breakdown.payout_breakdown(),
                notes: format!("Payment for order #{}", paid.short_id()),
            };
            let payout = match payouts::idempotent_insert(new_payout, conn).await? {
                InsertPayoutResult::Inserted(p) => p,
                InsertPayoutResult::AlreadyExists(p) => {
                    warn!("🗃️ Order {} already had payout #{}. No new payout was created.", paid.order_id, p.id);
                    p
                },
            };
            completed.push(SettlementStep::CreatePayout);
            Some(payout)
        },
        None => {
            debug!("🗃️ Order {} has no store. No payout is due.", paid.order_id);
            None
        },
    };
    Ok(Some(AppliedSettlement { order: paid, stock_changes, treasury, payout, mode }))
}

impl SettlementDatabase for SqliteDatabase {
    fn mode(&self) -> SettlementMode {
        self.mode
    }

    async fn apply_settlement(
        &self,
        order: &Order,
        items: &[OrderItem],
        breakdown: &SettlementBreakdown,
    ) -> Result<SettlementOutcome, SettlementError> {
        let order_id = order.order_id.clone();
        let mut uow = UnitOfWork::begin(&self.pool, self.mode).await?;
        let mode = uow.mode();
        let mut completed = Vec::with_capacity(4);
        let result = settlement_steps(uow.conn(), order, items, breakdown, mode, &mut completed).await;
        match result {
            Ok(Some(applied)) => {
                uow.commit()
                    .await
                    .map_err(|e| SettlementError::TransactionAborted { order_id, reason: e.to_string() })?;
                Ok(SettlementOutcome::Settled(applied))
            },
            Ok(None) => {
                // Nothing was written. Dropping the unit of work releases the transaction.
                drop(uow);
                Ok(SettlementOutcome::AlreadySettled)
            },
            Err(e) => match mode {
                SettlementMode::Atomic => {
                    if let Err(rb) = uow.rollback().await {
                        warn!("🗃️ Rolling back the settlement of {order_id} failed: {rb}");
                    }
                    Err(SettlementError::TransactionAborted { order_id, reason: e.to_string() })
                },
                SettlementMode::Sequential if completed.is_empty() => Err(e),
                SettlementMode::Sequential => {
                    Err(SettlementError::PartialFailure { order_id, completed, reason: e.to_string() })
                },
            },
        }
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_by_payment_id(&self, payment_id: &str) -> Result<Vec<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_by_payment_id(payment_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_tracking_history(&self, order_id: &OrderId) -> Result<Vec<TrackingEntry>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let entries = orders::fetch_tracking_history(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn record_payment_status(&self, order_id: &OrderId, status: &str) -> Result<Option<Order>, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_payment_status(order_id, status, &mut tx).await?;
        tx.commit().await?;
        if order.is_some() {
            debug!("🗃️ Payment status of {order_id} is now '{status}'");
        }
        Ok(order)
    }

    async fn transition_order_status(
        &self,
        order_id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
        entry: NewTrackingEntry,
    ) -> Result<Option<Order>, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::update_status(order_id, from, to, &mut tx).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        orders::append_tracking_entry(order_id, entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} moved from {from} to {to}");
        Ok(Some(order))
    }
}

impl CartManagement for SqliteDatabase {
    async fn clear_cart(&self, buyer_id: &str) -> Result<u64, CartError> {
        let mut tx = self.pool.begin().await?;
        let removed = carts::clear_cart(buyer_id, &mut tx).await?;
        tx.commit().await?;
        Ok(removed)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }
}

impl SqliteDatabase {
    async fn close_payout(&self, id: i64, status: PayoutStatus) -> Result<Payout, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let payout = match payouts::close_payout(id, status, &mut tx).await? {
            Some(p) => p,
            None => {
                let existing = payouts::fetch_payout(id, &mut tx).await?;
                return match existing {
                    None => Err(SettlementError::PayoutNotFound(id)),
                    Some(p) => Err(SettlementError::InvalidPayoutTransition { id, from: p.status, to: status }),
                };
            },
        };
        if status == PayoutStatus::Completed {
            treasury::record_seller_payout(payout.amount, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(payout)
    }
}

impl TreasuryManagement for SqliteDatabase {
    async fn fetch_treasury(&self) -> Result<Treasury, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        treasury::ensure_exists(&mut conn).await?;
        let treasury = treasury::fetch_treasury(&mut conn).await?.unwrap_or_default();
        Ok(treasury)
    }

    async fn fetch_payout(&self, id: i64) -> Result<Option<Payout>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let payout = payouts::fetch_payout(id, &mut conn).await?;
        Ok(payout)
    }

    async fn fetch_payouts(&self, store_id: Option<&str>) -> Result<Vec<Payout>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let payouts = payouts::fetch_payouts(store_id, &mut conn).await?;
        Ok(payouts)
    }

    async fn fetch_payout_for_order(&self, order_id: &OrderId) -> Result<Option<Payout>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let payout = payouts::fetch_payout_for_order(order_id, &mut conn).await?;
        Ok(payout)
    }

    async fn complete_payout(&self, id: i64) -> Result<Payout, SettlementError> {
        let payout = self.close_payout(id, PayoutStatus::Completed).await?;
        debug!("🗃️ Payout #{id} of {} to store {} completed", payout.amount, payout.store_id);
        Ok(payout)
    }

    async fn fail_payout(&self, id: i64) -> Result<Payout, SettlementError> {
        let payout = self.close_payout(id, PayoutStatus::Failed).await?;
        debug!("🗃️ Payout #{id} to store {} marked as failed", payout.store_id);
        Ok(payout)
    }
}
