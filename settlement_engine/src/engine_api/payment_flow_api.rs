use std::fmt::Debug;

use log::*;
use market_common::Secret;

use crate::{
    db_types::{NewTrackingEntry, Order, OrderId, OrderStatusType, Principal, Rupiah},
    engine_api::{
        errors::PaymentFlowError,
        payment_objects::{
            NotificationResult,
            OrderNotificationResult,
            OrderPaymentOutcome,
            PaymentAction,
            PaymentNotification,
            StatusCheckResult,
        },
        settlement_api::SettlementApi,
        settlement_objects::{SettlementReceipt, SettlementResult},
    },
    events::EventProducers,
    helpers::verify_notification_signature,
    payment_provider::{PaymentProviderError, PaymentStatusProvider},
    traits::SettlementDatabase,
};

/// `PaymentFlowApi` hosts the three ways a payment reaches the settlement engine.
///
/// * [`PaymentFlowApi::handle_notification`] processes signed notifications pushed by the payment gateway.
/// * [`PaymentFlowApi::manual_verify`] lets an administrator settle an order directly.
/// * [`PaymentFlowApi::check_status`] asks the gateway for the authoritative payment status.
///
/// All three may race on the same order. They share one [`SettlementApi`], which applies each payment at most once.
pub struct PaymentFlowApi<B, P> {
    settlement: SettlementApi<B>,
    provider: P,
    server_key: Secret<String>,
}

impl<B, P> Debug for PaymentFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, P> PaymentFlowApi<B, P> {
    pub fn new(db: B, producers: EventProducers, provider: P, server_key: Secret<String>) -> Self {
        let settlement = SettlementApi::new(db, producers);
        Self { settlement, provider, server_key }
    }

    pub fn settlement(&self) -> &SettlementApi<B> {
        &self.settlement
    }

    pub fn db(&self) -> &B {
        self.settlement.db()
    }
}

impl<B, P> PaymentFlowApi<B, P>
where
    B: SettlementDatabase,
    P: PaymentStatusProvider,
{
    /// Processes a payment notification from the gateway.
    ///
    /// The signature is checked before anything is read from the database. Every local order that carries the
    /// notification's payment id is then handled according to the transaction status. Re-delivered notifications
    /// succeed without repeating any effect.
    pub async fn handle_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<NotificationResult, PaymentFlowError> {
        let valid = verify_notification_signature(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            self.server_key.reveal(),
            &notification.signature_key,
        );
        if !valid {
            warn!("🔔️ Rejected a notification for payment {} with an invalid signature", notification.order_id);
            return Err(PaymentFlowError::InvalidSignature);
        }
        let payment_id = notification.order_id.as_str();
        let orders = self.db().fetch_orders_by_payment_id(payment_id).await?;
        if orders.is_empty() {
            warn!("🔔️ Received a notification for payment {payment_id}, but no orders are associated with it");
            return Err(PaymentFlowError::PaymentNotFound(payment_id.to_string()));
        }
        let action = notification.action();
        debug!(
            "🔔️ Payment {payment_id} is '{}' (fraud status {:?}). {} order(s) affected. Action: {action:?}",
            notification.transaction_status,
            notification.fraud_status,
            orders.len()
        );
        check_gross_amount(payment_id, &notification.gross_amount, &orders);
        let status = notification.transaction_status.trim().to_ascii_lowercase();
        let mut results = Vec::with_capacity(orders.len());
        for order in orders {
            let outcome = match action {
                PaymentAction::Settle => self.settle_one(&order).await?,
                PaymentAction::Cancel => self.cancel_one(&order, &status).await?,
                PaymentAction::RecordPending | PaymentAction::RecordOnly => self.record_one(&order, &status).await?,
            };
            trace!("🔔️ Order {}: {outcome:?}", order.order_id);
            results.push(OrderNotificationResult { order_id: order.order_id, outcome });
        }
        let result =
            NotificationResult { payment_id: payment_id.to_string(), transaction_status: status, action, orders: results };
        info!(
            "🔔️ Notification for payment {payment_id} processed. {} of {} order(s) settled.",
            result.settled_count(),
            result.orders.len()
        );
        Ok(result)
    }

    /// Settles an order on an administrator's say-so. Unlike the other entry points, settling an order that is
    /// already paid is reported as an error.
    pub async fn manual_verify(&self, order_id: &OrderId) -> Result<SettlementReceipt, PaymentFlowError> {
        let order = self
            .db()
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::OrderNotFound(order_id.to_string()))?;
        if order.is_paid {
            debug!("💰️ Manual verification of {order_id} refused. The order is already paid.");
            return Err(PaymentFlowError::AlreadyPaid(order.order_id));
        }
        info!("💰️ Order {order_id} is being manually verified");
        match self.settlement.settle(&order).await? {
            SettlementResult::Settled(receipt) => Ok(receipt),
            SettlementResult::AlreadySettled { order } => Err(PaymentFlowError::AlreadyPaid(order.order_id)),
        }
    }

    /// Polls the gateway for the status of an order's payment. `id` may be an order id or a payment id.
    ///
    /// If the gateway reports the payment as settled, every unpaid order sharing the payment id is settled. If the
    /// gateway cannot be reached, the locally known status is returned and nothing is changed.
    pub async fn check_status(&self, id: &str, principal: &Principal) -> Result<StatusCheckResult, PaymentFlowError> {
        let order = self.find_order(id).await?.ok_or_else(|| PaymentFlowError::OrderNotFound(id.to_string()))?;
        if !principal.can_view(&order) {
            return Err(PaymentFlowError::Forbidden(format!("{} may not view order {}", principal.id, order.order_id)));
        }
        let payment_id = match order.payment_id.clone() {
            Some(p) => p,
            None => {
                debug!("🔍️ Order {} has no payment id. Reporting the local status.", order.order_id);
                return Ok(status_result(order, None, false, Vec::new()));
            },
        };
        let gateway = match self.provider.payment_status(&payment_id).await {
            Ok(status) => status,
            Err(PaymentProviderError::TransactionNotFound(_)) => {
                debug!("🔍️ The gateway does not know payment {payment_id} yet");
                return Ok(status_result(order, None, true, Vec::new()));
            },
            Err(e) => {
                warn!("🔍️ Could not get the status of payment {payment_id}. Reporting the local status. {e}");
                return Ok(status_result(order, None, false, Vec::new()));
            },
        };
        let action = PaymentAction::from_raw(&gateway.transaction_status, gateway.fraud_status.as_deref());
        debug!("🔍️ The gateway reports payment {payment_id} as '{}'", gateway.transaction_status);
        if action != PaymentAction::Settle {
            return Ok(status_result(order, Some(gateway.transaction_status), true, Vec::new()));
        }
        let mut settled_orders = Vec::new();
        for sibling in self.db().fetch_orders_by_payment_id(&payment_id).await? {
            if sibling.is_paid {
                continue;
            }
            if self.settlement.settle(&sibling).await?.was_settled() {
                settled_orders.push(sibling.order_id);
            }
        }
        if !settled_orders.is_empty() {
            info!("🔍️ Status poll of payment {payment_id} settled {} order(s)", settled_orders.len());
        }
        let order = self.db().fetch_order_by_order_id(&order.order_id).await?.unwrap_or(order);
        Ok(status_result(order, Some(gateway.transaction_status), true, settled_orders))
    }

    async fn find_order(&self, id: &str) -> Result<Option<Order>, PaymentFlowError> {
        let by_order_id = self.db().fetch_order_by_order_id(&OrderId::from(id)).await?;
        if by_order_id.is_some() {
            return Ok(by_order_id);
        }
        let by_payment_id = self.db().fetch_orders_by_payment_id(id).await?;
        Ok(by_payment_id.into_iter().next())
    }

    async fn settle_one(&self, order: &Order) -> Result<OrderPaymentOutcome, PaymentFlowError> {
        match self.settlement.settle(order).await? {
            SettlementResult::Settled(_) => Ok(OrderPaymentOutcome::Settled),
            SettlementResult::AlreadySettled { .. } => Ok(OrderPaymentOutcome::AlreadySettled),
        }
    }

    async fn record_one(&self, order: &Order, status: &str) -> Result<OrderPaymentOutcome, PaymentFlowError> {
        if order.is_paid {
            return Ok(OrderPaymentOutcome::Ignored(format!("order is paid; '{status}' not recorded")));
        }
        match self.db().record_payment_status(&order.order_id, status).await? {
            Some(_) => Ok(OrderPaymentOutcome::StatusRecorded),
            None => Ok(OrderPaymentOutcome::Ignored(format!("order was paid meanwhile; '{status}' not recorded"))),
        }
    }

    /// Orders that are still awaiting payment stay hidden from sellers, so a failed payment only records the status.
    /// Any other order is canceled. A paid order keeps its settlement; the money is not reversed here.
    async fn cancel_one(&self, order: &Order, status: &str) -> Result<OrderPaymentOutcome, PaymentFlowError> {
        if order.is_awaiting_payment() || order.status == OrderStatusType::Canceled {
            return self.record_one(order, status).await;
        }
        if order.is_paid {
            warn!(
                "🔔️ The gateway reports '{status}' for order {}, which is already paid. The order is canceled, but the                  settled payment and its payout need manual reconciliation.",
                order.order_id
            );
        } else {
            self.record_one(order, status).await?;
        }
        let entry = NewTrackingEntry::new(
            OrderStatusType::Canceled,
            "Order canceled",
            format!("The payment failed with status '{status}'."),
        );
        match self.db().transition_order_status(&order.order_id, order.status, OrderStatusType::Canceled, entry).await? {
            Some(_) => {
                info!("🔔️ Order {} canceled after payment status '{status}'", order.order_id);
                Ok(OrderPaymentOutcome::Canceled)
            },
            None => Ok(OrderPaymentOutcome::Ignored(format!("order status changed meanwhile; '{status}' not applied"))),
        }
    }
}

fn status_result(
    order: Order,
    gateway_status: Option<String>,
    gateway_reachable: bool,
    settled_orders: Vec<OrderId>,
) -> StatusCheckResult {
    let settled = settled_orders.contains(&order.order_id);
    StatusCheckResult {
        order_id: order.order_id,
        payment_id: order.payment_id,
        status: order.status,
        is_paid: order.is_paid,
        payment_status: order.payment_status,
        gateway_status,
        gateway_reachable,
        settled,
        settled_orders,
    }
}

fn check_gross_amount(payment_id: &str, gross_amount: &str, orders: &[Order]) {
    let Some(expected) = Rupiah::checked_sum(orders.iter().map(|o| o.total_price)) else {
        warn!("🔔️ The orders of payment {payment_id} total more than can be represented");
        return;
    };
    match gross_amount.parse::<Rupiah>() {
        Ok(gross) if gross != expected => warn!(
            "🔔️ Payment {payment_id} reports a gross amount of {gross}, but its orders total {expected}. Processing \
             continues."
        ),
        Ok(_) => {},
        Err(e) => warn!("🔔️ Could not read the gross amount of payment {payment_id}. {e}"),
    }
}
