use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, Payout, SettlementMode},
    engine_api::{
        errors::SettlementError,
        settlement_objects::{SettlementBreakdown, SettlementOutcome, SettlementReceipt, SettlementResult},
    },
    events::{EventProducers, OrderSettledEvent},
    traits::SettlementDatabase,
};

/// `SettlementApi` moves an order from unpaid to paid and applies the financial effects of the payment exactly once.
///
/// Every payment entry point (gateway notifications, manual verification and status polls) funnels through
/// [`SettlementApi::settle`]. Re-entrancy is gated by the storage layer: marking the order paid is a conditional
/// update, and the attempt that loses the race reports [`SettlementResult::AlreadySettled`] without touching stock,
/// the treasury or payouts.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B: Clone> Clone for SettlementApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    pub fn mode(&self) -> SettlementMode {
        self.db.mode()
    }

    /// Settles the order with the given public id.
    pub async fn settle_order_id(&self, order_id: &OrderId) -> Result<SettlementResult, SettlementError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.clone()))?;
        self.settle(&order).await
    }

    /// Runs the settlement sequence for `order`.
    ///
    /// The order is marked paid, stock is reduced, the treasury is credited and, if the order has a store, a pending
    /// payout is created. In atomic mode these steps commit or roll back together. Afterwards the buyer's cart is
    /// cleared on a best-effort basis and an [`OrderSettledEvent`] is published.
    ///
    /// Settling an order that is already paid is not an error.
    pub async fn settle(&self, order: &Order) -> Result<SettlementResult, SettlementError> {
        if order.is_paid {
            debug!("💰️ Order {} is already paid. Nothing to settle.", order.order_id);
            return Ok(SettlementResult::AlreadySettled { order: order.clone() });
        }
        let items = self.db.fetch_order_items(&order.order_id).await?;
        let breakdown = SettlementBreakdown::for_order(order, &items)?;
        let mode = self.db.mode();
        if mode == SettlementMode::Sequential {
            warn!(
                "💰️ Settling order {} WITHOUT a transaction. If a step fails, the effects of earlier steps remain \
                 and must be reconciled by hand.",
                order.order_id
            );
        }
        trace!("💰️ Settling order {} with breakdown {breakdown:?}", order.order_id);
        let outcome = match self.db.apply_settlement(order, &items, &breakdown).await {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    SettlementError::PartialFailure { order_id, completed, reason } => error!(
                        "💰️ Settlement of order {order_id} failed part-way through. Steps {completed:?} have been \
                         applied. MANUAL RECONCILIATION IS REQUIRED. {reason}"
                    ),
                    e => warn!("💰️ Settlement of order {} failed. {e}", order.order_id),
                }
                return Err(e);
            },
        };
        let applied = match outcome {
            SettlementOutcome::Settled(applied) => applied,
            SettlementOutcome::AlreadySettled => {
                debug!("💰️ Order {} was settled by a concurrent attempt. Nothing to do.", order.order_id);
                let current = self.db.fetch_order_by_order_id(&order.order_id).await?.unwrap_or_else(|| order.clone());
                return Ok(SettlementResult::AlreadySettled { order: current });
            },
        };
        if applied.order.status == OrderStatusType::Canceled {
            warn!(
                "💰️ Order {} was canceled before its payment arrived. The payment has been settled and the order \
                 stays canceled. Its payout and treasury credit need manual reconciliation.",
                applied.order.order_id
            );
        }
        let cart_cleared = match self.db.clear_cart(&applied.order.buyer_id).await {
            Ok(n) => {
                trace!("💰️ Removed {n} items from the cart of buyer {}", applied.order.buyer_id);
                true
            },
            Err(e) => {
                warn!("💰️ Order {} is settled, but the buyer's cart could not be cleared. {e}", applied.order.order_id);
                false
            },
        };
        info!(
            "💰️ Order {} settled ({} mode). Seller {}, shipping {}, admin fee {}.",
            applied.order.order_id, applied.mode, breakdown.seller_amount, breakdown.shipping_cost, breakdown.admin_fee
        );
        self.call_order_settled_hook(&applied.order, &breakdown, &applied.payout, applied.mode).await;
        Ok(SettlementResult::Settled(SettlementReceipt {
            order: applied.order,
            breakdown,
            stock_changes: applied.stock_changes,
            payout: applied.payout,
            mode: applied.mode,
            cart_cleared,
        }))
    }

    async fn call_order_settled_hook(
        &self,
        order: &Order,
        breakdown: &SettlementBreakdown,
        payout: &Option<Payout>,
        mode: SettlementMode,
    ) {
        for emitter in &self.producers.order_settled_producer {
            debug!("💰️ Notifying order settled hook subscribers");
            let event = OrderSettledEvent::new(order.clone(), *breakdown, payout.clone(), mode);
            emitter.publish_event(event).await;
        }
    }
}
