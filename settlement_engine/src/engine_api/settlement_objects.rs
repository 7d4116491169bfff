use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderItem, Payout, PayoutBreakdown, Rupiah, SettlementMode, Treasury},
    engine_api::errors::SettlementError,
};

/// The individual steps of a settlement, in execution order. Used to report how far a degraded-mode settlement got
/// before it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStep {
    MarkPaid,
    ReduceStock,
    CreditTreasury,
    CreatePayout,
}

impl Display for SettlementStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStep::MarkPaid => write!(f, "mark_paid"),
            SettlementStep::ReduceStock => write!(f, "reduce_stock"),
            SettlementStep::CreditTreasury => write!(f, "credit_treasury"),
            SettlementStep::CreatePayout => write!(f, "create_payout"),
        }
    }
}

/// How the money of a settled order is split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBreakdown {
    /// What the store is owed. The seller earnings recorded at checkout, if any, otherwise the item total.
    pub seller_amount: Rupiah,
    pub shipping_cost: Rupiah,
    pub admin_fee: Rupiah,
    /// The sum of `price × quantity` over the stored line items.
    pub items_total: Rupiah,
}

impl SettlementBreakdown {
    /// Seller earnings captured at checkout take precedence over the recomputed item total. The item total is computed
    /// from the prices stored with the order, never from current catalog prices.
    ///
    /// Fails if the item total or the amount credited to the treasury overflows.
    pub fn for_order(order: &Order, items: &[OrderItem]) -> Result<Self, SettlementError> {
        let too_large = || SettlementError::InvalidOrder {
            order_id: order.order_id.clone(),
            reason: "Its amounts are too large to be settled.".to_string(),
        };
        let line_totals = items.iter().map(OrderItem::line_total).collect::<Option<Vec<_>>>().ok_or_else(too_large)?;
        let items_total = Rupiah::checked_sum(line_totals).ok_or_else(too_large)?;
        let seller_amount = match order.seller_earnings {
            Some(earnings) => {
                if earnings != items_total {
                    debug!(
                        "💰️ Order {} records seller earnings of {earnings}, but its items total {items_total}. Using \
                         the recorded earnings.",
                        order.order_id
                    );
                }
                earnings
            },
            None => items_total,
        };
        let shipping_cost = order.shipping_cost.unwrap_or_default();
        let admin_fee = order.admin_fee.unwrap_or_default();
        Rupiah::checked_sum([seller_amount, shipping_cost, admin_fee]).ok_or_else(too_large)?;
        Ok(Self { seller_amount, shipping_cost, admin_fee, items_total })
    }

    pub fn payout_breakdown(&self) -> PayoutBreakdown {
        PayoutBreakdown {
            product_total: self.seller_amount,
            shipping_cost: self.shipping_cost,
            admin_fee: self.admin_fee,
        }
    }
}

/// The result of reducing stock for one line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: String,
    pub quantity: i64,
    /// The stock level after the change. `None` when the product no longer exists.
    pub stock_after: Option<i64>,
}

/// What the storage layer did while applying a settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedSettlement {
    pub order: Order,
    pub stock_changes: Vec<StockChange>,
    pub treasury: Treasury,
    pub payout: Option<Payout>,
    pub mode: SettlementMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SettlementOutcome {
    Settled(AppliedSettlement),
    /// The order was already paid by the time the settlement ran. Nothing was changed.
    AlreadySettled,
}

/// The settlement engine's report on a completed settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub order: Order,
    pub breakdown: SettlementBreakdown,
    pub stock_changes: Vec<StockChange>,
    pub payout: Option<Payout>,
    pub mode: SettlementMode,
    pub cart_cleared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SettlementResult {
    Settled(SettlementReceipt),
    AlreadySettled { order: Order },
}

impl SettlementResult {
    pub fn order(&self) -> &Order {
        match self {
            SettlementResult::Settled(receipt) => &receipt.order,
            SettlementResult::AlreadySettled { order } => order,
        }
    }

    pub fn was_settled(&self) -> bool {
        matches!(self, SettlementResult::Settled(_))
    }
}
