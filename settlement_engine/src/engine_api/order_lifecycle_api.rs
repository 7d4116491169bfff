use std::{fmt::Debug, str::FromStr};

use log::*;

use crate::{
    db_types::{NewTrackingEntry, Order, OrderId, OrderStatusType, Principal, Role},
    engine_api::errors::LifecycleError,
    events::{EventProducers, OrderStatusChangedEvent},
    traits::OrderManagement,
};

/// `OrderLifecycleApi` moves paid orders through shipping and delivery, and handles cancellations.
///
/// Who may do what:
///
/// | role   | target statuses              | orders                                   |
/// |--------|------------------------------|------------------------------------------|
/// | admin  | shipped, delivered, canceled | any                                      |
/// | seller | shipped, delivered, canceled | those placed with the seller's store     |
/// | buyer  | delivered, canceled          | their own, and cancel only before shipping |
///
/// Only `pending` orders can be shipped and only `shipped` orders can be delivered. Any order that is not already
/// canceled can be canceled.
pub struct OrderLifecycleApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderLifecycleApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLifecycleApi")
    }
}

impl<B> OrderLifecycleApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// The target statuses each role may request.
pub fn allowed_targets(role: Role) -> &'static [OrderStatusType] {
    use OrderStatusType::*;
    match role {
        Role::Admin | Role::Seller => &[Shipped, Delivered, Canceled],
        Role::Buyer => &[Delivered, Canceled],
    }
}

/// Whether an order in status `from` may move to `to`, ignoring who is asking.
pub fn is_valid_transition(from: OrderStatusType, to: OrderStatusType) -> bool {
    use OrderStatusType::*;
    match to {
        Shipped => from == Pending,
        Delivered => from == Shipped,
        Canceled => from != Canceled,
        AwaitingPayment | Pending => false,
    }
}

fn tracking_entry_for(to: OrderStatusType, principal: &Principal, role: Role) -> NewTrackingEntry {
    match to {
        OrderStatusType::Shipped => {
            NewTrackingEntry::new(to, "Order shipped", "The seller has handed the order to the courier.")
        },
        OrderStatusType::Delivered => NewTrackingEntry::new(to, "Order delivered", "The order has been delivered."),
        _ => {
            let description = format!("The order was canceled by the {role} ({}).", principal.id);
            NewTrackingEntry::new(to, "Order canceled", description)
        },
    }
}

impl<B> OrderLifecycleApi<B>
where B: OrderManagement
{
    /// Moves an order to `target` on behalf of `principal`, appending a tracking entry.
    ///
    /// The update only applies if the order is still in the status it was read in, so two racing transitions cannot
    /// both succeed.
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: &OrderId,
        target: &str,
    ) -> Result<Order, LifecycleError> {
        let status_not_allowed = || LifecycleError::StatusNotAllowed {
            role: principal.roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(","),
            status: target.to_string(),
        };
        let to = OrderStatusType::from_str(target.trim()).map_err(|_| status_not_allowed())?;
        if !principal.roles.iter().any(|r| allowed_targets(*r).contains(&to)) {
            return Err(status_not_allowed());
        }
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| LifecycleError::OrderNotFound(order_id.clone()))?;
        let role = acting_role(principal, &order).ok_or_else(|| {
            debug!("📦️ {} tried to change order {order_id}, which is not theirs", principal.id);
            LifecycleError::NotOrderOwner(order_id.clone())
        })?;
        if !allowed_targets(role).contains(&to) {
            return Err(LifecycleError::StatusNotAllowed { role: role.to_string(), status: to.to_string() });
        }
        let from = order.status;
        let buyer_cancel_after_shipping = role == Role::Buyer &&
            to == OrderStatusType::Canceled &&
            matches!(from, OrderStatusType::Shipped | OrderStatusType::Delivered);
        if !is_valid_transition(from, to) || buyer_cancel_after_shipping {
            return Err(LifecycleError::InvalidTransition { order_id: order_id.clone(), from, to });
        }
        let entry = tracking_entry_for(to, principal, role);
        let updated = match self.db.transition_order_status(order_id, from, to, entry).await? {
            Some(o) => o,
            None => {
                let current = self.db.fetch_order_by_order_id(order_id).await?.map(|o| o.status).unwrap_or(from);
                debug!("📦️ Order {order_id} changed status to {current} before it could move to {to}");
                return Err(LifecycleError::InvalidTransition { order_id: order_id.clone(), from: current, to });
            },
        };
        info!("📦️ Order {order_id} moved from {from} to {to} by {role} {}", principal.id);
        self.call_status_changed_hook(&updated, from, &principal.id).await;
        Ok(updated)
    }

    async fn call_status_changed_hook(&self, order: &Order, old_status: OrderStatusType, changed_by: &str) {
        for emitter in &self.producers.status_changed_producer {
            debug!("📦️ Notifying status changed hook subscribers");
            let event = OrderStatusChangedEvent::new(order.clone(), old_status, changed_by.to_string());
            emitter.publish_event(event).await;
        }
    }
}

/// The capacity in which `principal` acts on `order`, or `None` if the order is none of their business.
fn acting_role(principal: &Principal, order: &Order) -> Option<Role> {
    if principal.is_admin() {
        Some(Role::Admin)
    } else if principal.is_seller_of(order) {
        Some(Role::Seller)
    } else if principal.has_role(Role::Buyer) && principal.is_buyer_of(order) {
        Some(Role::Buyer)
    } else {
        None
    }
}
