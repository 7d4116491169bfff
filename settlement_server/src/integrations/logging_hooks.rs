//! Event hooks that record settlements and status changes in the log. Delivering notifications to buyers and sellers
//! is handled elsewhere.
use futures::future::BoxFuture;
use log::*;
use settlement_engine::events::{EventHandlers, EventHooks, OrderSettledEvent, OrderStatusChangedEvent};

const LOGGING_EVENT_BUFFER_SIZE: usize = 25;

pub fn create_logging_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_settled(log_settlement);
    hooks.on_status_changed(log_status_change);
    EventHandlers::new(LOGGING_EVENT_BUFFER_SIZE, hooks)
}

fn log_settlement(ev: OrderSettledEvent) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let OrderSettledEvent { order, breakdown, payout, mode } = ev;
        let payout = payout
            .map(|p| format!("payout #{} to {}", p.id, p.store_id))
            .unwrap_or_else(|| "no payout".to_string());
        info!(
            "📬️ Order {} settled ({mode}). Seller {}, shipping {}, fee {}, {payout}",
            order.order_id, breakdown.seller_amount, breakdown.shipping_cost, breakdown.admin_fee
        );
    })
}

fn log_status_change(ev: OrderStatusChangedEvent) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let OrderStatusChangedEvent { order, old_status, new_status, changed_by } = ev;
        info!("📬️ Order {} moved from {old_status} to {new_status} by {changed_by}", order.order_id);
    })
}
