use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, PayoutStatus},
    engine_api::settlement_objects::SettlementStep,
};

/// Errors raised by the storage layer and the settlement engine.
#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has already been settled")]
    AlreadySettled(OrderId),
    #[error("Settlement of order {order_id} was rolled back. {reason}")]
    TransactionAborted { order_id: OrderId, reason: String },
    #[error(
        "Settlement of order {order_id} failed after completing {completed:?}. Manual reconciliation is required. \
         {reason}"
    )]
    PartialFailure { order_id: OrderId, completed: Vec<SettlementStep>, reason: String },
    #[error("Payout {id} cannot move from {from} to {to}")]
    InvalidPayoutTransition { id: i64, from: PayoutStatus, to: PayoutStatus },
    #[error("Payout {0} does not exist")]
    PayoutNotFound(i64),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidOrderTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {order_id} is invalid. {reason}")]
    InvalidOrder { order_id: OrderId, reason: String },
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

/// Errors raised by the three payment entry points: gateway notifications, manual verification and status polls.
#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("The notification signature is invalid")]
    InvalidSignature,
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("No orders are associated with payment {0}")]
    PaymentNotFound(String),
    #[error("Order {0} has already been paid")]
    AlreadyPaid(OrderId),
    #[error("Insufficient permissions. {0}")]
    Forbidden(String),
    #[error("{0}")]
    Settlement(#[from] SettlementError),
}

#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Status '{status}' is not allowed for {role}s")]
    StatusNotAllowed { role: String, status: String },
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} does not belong to you")]
    NotOrderOwner(OrderId),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<SettlementError> for LifecycleError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::OrderNotFound(id) => LifecycleError::OrderNotFound(id),
            SettlementError::InvalidOrderTransition { order_id, from, to } => {
                LifecycleError::InvalidTransition { order_id, from, to }
            },
            e => LifecycleError::Database(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TreasuryError {
    #[error("Payout {0} does not exist")]
    PayoutNotFound(i64),
    #[error("Payout {id} cannot move from {from} to {to}")]
    InvalidPayoutTransition { id: i64, from: PayoutStatus, to: PayoutStatus },
    #[error("Database error: {0}")]
    Database(String),
}

impl From<SettlementError> for TreasuryError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::PayoutNotFound(id) => TreasuryError::PayoutNotFound(id),
            SettlementError::InvalidPayoutTransition { id, from, to } => {
                TreasuryError::InvalidPayoutTransition { id, from, to }
            },
            e => TreasuryError::Database(e.to_string()),
        }
    }
}

/// Clearing a cart is a best-effort side effect. This error is logged and never surfaced to callers.
#[derive(Debug, Clone, Error)]
#[error("Could not clear cart: {0}")]
pub struct CartError(pub String);

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        CartError(e.to_string())
    }
}
