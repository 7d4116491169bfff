use crate::db_types::{Order, Payout};

#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InsertPayoutResult {
    Inserted(Payout),
    /// The storage uniqueness constraint rejected a second order payment for the same order.
    AlreadyExists(Payout),
}

impl InsertPayoutResult {
    pub fn into_payout(self) -> Payout {
        match self {
            InsertPayoutResult::Inserted(p) | InsertPayoutResult::AlreadyExists(p) => p,
        }
    }
}
