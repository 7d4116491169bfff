use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType, Payout, SettlementMode},
    engine_api::settlement_objects::SettlementBreakdown,
};

/// Published once for every order that is settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettledEvent {
    pub order: Order,
    pub breakdown: SettlementBreakdown,
    pub payout: Option<Payout>,
    pub mode: SettlementMode,
}

impl OrderSettledEvent {
    pub fn new(order: Order, breakdown: SettlementBreakdown, payout: Option<Payout>, mode: SettlementMode) -> Self {
        Self { order, breakdown, payout, mode }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
    /// The id of the principal who made the change.
    pub changed_by: String,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType, changed_by: String) -> Self {
        let new_status = order.status;
        Self { order, old_status, new_status, changed_by }
    }
}

#[derive(Debug, Clone)]
pub enum EventType {
    OrderSettled(OrderSettledEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
}
