use crate::{
    db_types::{FullOrder, NewOrder, NewTrackingEntry, Order, OrderId, OrderItem, OrderStatusType, TrackingEntry},
    engine_api::errors::SettlementError,
    traits::InsertOrderResult,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order with its line items and an initial tracking entry. The call is idempotent: if an order with
    /// the same `order_id` exists, it is returned unchanged.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, SettlementError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, SettlementError>;

    /// All orders sharing the given gateway payment id, oldest first.
    async fn fetch_orders_by_payment_id(&self, payment_id: &str) -> Result<Vec<Order>, SettlementError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, SettlementError>;

    async fn fetch_tracking_history(&self, order_id: &OrderId) -> Result<Vec<TrackingEntry>, SettlementError>;

    async fn fetch_full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, SettlementError> {
        let order = match self.fetch_order_by_order_id(order_id).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let items = self.fetch_order_items(order_id).await?;
        let tracking_history = self.fetch_tracking_history(order_id).await?;
        Ok(Some(FullOrder { order, items, tracking_history }))
    }

    /// Records the gateway's latest payment status on an unpaid order. Returns `None` if the order does not exist or
    /// has already been paid, in which case nothing changes.
    async fn record_payment_status(&self, order_id: &OrderId, status: &str) -> Result<Option<Order>, SettlementError>;

    /// Moves an order from `from` to `to` and appends the tracking entry, as a single conditional update. Returns
    /// `None` if the order was no longer in `from` status.
    ///
    /// Moving to `shipped` or `delivered` sets the corresponding timestamp if it is not already set.
    async fn transition_order_status(
        &self,
        order_id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
        entry: NewTrackingEntry,
    ) -> Result<Option<Order>, SettlementError>;
}
