use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Payout, Treasury},
    engine_api::errors::TreasuryError,
    traits::TreasuryManagement,
};

/// Read access to the platform ledger, and the administrative side of the payout lifecycle.
///
/// Payouts are created by settlements. Here they can only be listed, and moved from `pending` to `completed` or
/// `failed`. Completing a payout releases its amount from the seller pending balance.
pub struct TreasuryApi<B> {
    db: B,
}

impl<B> Debug for TreasuryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreasuryApi")
    }
}

impl<B> TreasuryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> TreasuryApi<B>
where B: TreasuryManagement
{
    pub async fn treasury(&self) -> Result<Treasury, TreasuryError> {
        let treasury = self.db.fetch_treasury().await?;
        Ok(treasury)
    }

    pub async fn payouts(&self, store_id: Option<&str>) -> Result<Vec<Payout>, TreasuryError> {
        let payouts = self.db.fetch_payouts(store_id).await?;
        trace!("🏦️ Fetched {} payouts (store filter: {store_id:?})", payouts.len());
        Ok(payouts)
    }

    pub async fn payout(&self, id: i64) -> Result<Payout, TreasuryError> {
        self.db.fetch_payout(id).await?.ok_or(TreasuryError::PayoutNotFound(id))
    }

    pub async fn complete_payout(&self, id: i64) -> Result<Payout, TreasuryError> {
        let payout = self.db.complete_payout(id).await.map_err(|e| {
            warn!("🏦️ Could not complete payout #{id}. {e}");
            TreasuryError::from(e)
        })?;
        info!("🏦️ Paid {} to store {} (payout #{id})", payout.amount, payout.store_id);
        Ok(payout)
    }

    pub async fn fail_payout(&self, id: i64) -> Result<Payout, TreasuryError> {
        let payout = self.db.fail_payout(id).await.map_err(|e| {
            warn!("🏦️ Could not mark payout #{id} as failed. {e}");
            TreasuryError::from(e)
        })?;
        info!("🏦️ Payout #{id} to store {} failed", payout.store_id);
        Ok(payout)
    }
}
