use cucumber::{then, when};
use settlement_engine::{
    db_types::{OrderId, PayoutStatus, Rupiah},
    engine_api::payment_objects::PaymentNotification,
    helpers::notification_signature,
    test_utils::fixtures::stock_of,
    OrderManagement,
};

use crate::cucumber::{world::SERVER_KEY, MarketWorld};

fn notification(payment_id: &str, status: &str, gross: &str) -> PaymentNotification {
    PaymentNotification {
        order_id: payment_id.to_string(),
        transaction_status: status.to_string(),
        status_code: "200".to_string(),
        gross_amount: gross.to_string(),
        signature_key: notification_signature(payment_id, "200", gross, SERVER_KEY),
        ..Default::default()
    }
}

#[when(expr = "the gateway reports {string} for {string}")]
async fn gateway_reports(world: &mut MarketWorld, status: String, payment_id: String) {
    let n = notification(&payment_id, &status, "105000.00");
    let result = world.system().payments.handle_notification(&n).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "a notification for {string} arrives with a tampered signature")]
async fn tampered_notification(world: &mut MarketWorld, payment_id: String) {
    let mut n = notification(&payment_id, "settlement", "105000.00");
    n.gross_amount = "1000.00".into();
    let result = world.system().payments.handle_notification(&n).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "an admin manually verifies {string}")]
async fn manual_verify(world: &mut MarketWorld, order_id: String) {
    let result = world.system().payments.manual_verify(&OrderId::from(order_id)).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[then(expr = "the request fails with {string}")]
async fn request_fails(world: &mut MarketWorld, message: String) {
    let err = world.last_error.as_deref().expect("The last request should have failed");
    assert!(err.contains(&message), "'{err}' does not contain '{message}'");
}

#[then("the notification is acknowledged")]
async fn acknowledged(world: &mut MarketWorld) {
    assert_eq!(world.last_error, None);
}

#[then(expr = "order {string} is paid")]
async fn order_is_paid(world: &mut MarketWorld, order_id: String) {
    let order = world.db().fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().expect("No such order");
    assert!(order.is_paid);
    assert!(order.paid_at.is_some());
}

#[then(expr = "order {string} is not paid")]
async fn order_is_not_paid(world: &mut MarketWorld, order_id: String) {
    let order = world.db().fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().expect("No such order");
    assert!(!order.is_paid);
    assert!(order.paid_at.is_none());
}

#[then(expr = "the stock of {string} is {int}")]
async fn stock_is(world: &mut MarketWorld, product_id: String, stock: i64) {
    assert_eq!(stock_of(world.db(), &product_id).await, stock);
}

#[then(expr = "the treasury holds {int} for sellers, {int} for shipping and {int} in admin fees")]
async fn treasury_holds(world: &mut MarketWorld, sellers: i64, shipping: i64, admin_fees: i64) {
    let treasury = world.system().treasury.treasury().await.expect("Error fetching treasury");
    assert_eq!(treasury.seller_pending_balance, Rupiah::from(sellers));
    assert_eq!(treasury.shipping_balance, Rupiah::from(shipping));
    assert_eq!(treasury.admin_fee_balance, Rupiah::from(admin_fees));
}

#[then(expr = "store {string} has {int} pending payout(s) of {int}")]
async fn store_payouts(world: &mut MarketWorld, store_id: String, count: usize, amount: i64) {
    let payouts = world.system().treasury.payouts(Some(store_id.as_str())).await.expect("Error fetching payouts");
    assert_eq!(payouts.len(), count);
    for payout in payouts {
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert_eq!(payout.amount, Rupiah::from(amount));
    }
}

#[then("there are no payouts")]
async fn no_payouts(world: &mut MarketWorld) {
    let payouts = world.system().treasury.payouts(None).await.expect("Error fetching payouts");
    assert!(payouts.is_empty());
}
