use crate::{
    db_types::{OrderId, Payout, Treasury},
    engine_api::errors::SettlementError,
};

#[allow(async_fn_in_trait)]
pub trait TreasuryManagement {
    /// Returns the treasury ledger, creating an empty one if none exists yet.
    async fn fetch_treasury(&self) -> Result<Treasury, SettlementError>;

    async fn fetch_payout(&self, id: i64) -> Result<Option<Payout>, SettlementError>;

    /// All payouts, newest first, optionally limited to one store.
    async fn fetch_payouts(&self, store_id: Option<&str>) -> Result<Vec<Payout>, SettlementError>;

    /// The order-payment payout created when the order was settled, if any.
    async fn fetch_payout_for_order(&self, order_id: &OrderId) -> Result<Option<Payout>, SettlementError>;

    /// Marks a pending payout as disbursed. In the same atomic step, the amount moves from the seller pending balance to
    /// the total of seller payouts.
    async fn complete_payout(&self, id: i64) -> Result<Payout, SettlementError>;

    /// Marks a pending payout as failed. The ledger is not touched.
    async fn fail_payout(&self, id: i64) -> Result<Payout, SettlementError>;
}
