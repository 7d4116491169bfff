use crate::{
    db_types::{Order, OrderItem, SettlementMode},
    engine_api::{
        errors::SettlementError,
        settlement_objects::{SettlementBreakdown, SettlementOutcome},
    },
    traits::{CartManagement, OrderManagement},
};

/// The storage side of the settlement engine.
///
/// Implementations must guarantee exactly-once financial effect for each order, no matter how many callers race to
/// settle it:
/// * Marking the order as paid is a conditional update on `is_paid = false`. If it changes nothing, the settlement is
///   a no-op and [`SettlementOutcome::AlreadySettled`] is returned.
/// * Ledger changes are atomic increments.
/// * Duplicate payouts are rejected by a storage-level uniqueness constraint.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + OrderManagement + CartManagement {
    /// The way [`Self::apply_settlement`] executes its steps.
    fn mode(&self) -> SettlementMode;

    /// Marks the order as paid, reduces stock, credits the treasury and creates the seller payout.
    ///
    /// In [`SettlementMode::Atomic`] mode, any failure rolls everything back. In [`SettlementMode::Sequential`] mode,
    /// a failure after the first step is reported as [`SettlementError::PartialFailure`].
    async fn apply_settlement(
        &self,
        order: &Order,
        items: &[OrderItem],
        breakdown: &SettlementBreakdown,
    ) -> Result<SettlementOutcome, SettlementError>;
}
