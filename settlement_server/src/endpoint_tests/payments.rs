use std::net::SocketAddr;

use actix_web::{http::StatusCode, test::TestRequest};
use settlement_engine::{
    db_types::OrderId,
    payment_provider::PaymentProviderError,
    test_utils::{drop_test_database, fixtures::*},
    OrderManagement,
    TreasuryManagement,
};

use super::{
    helpers::*,
    mocks::{gateway_status, MockPaymentProvider},
};
use crate::config::ServerOptions;

fn notification_request(payment_id: &str, status: &str, gross_amount: &str) -> TestRequest {
    TestRequest::post().uri("/payment/notification").set_json(signed_notification(payment_id, status, gross_amount))
}

async fn is_paid(db: &settlement_engine::SqliteDatabase, order_id: &str) -> bool {
    db.fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().unwrap().is_paid
}

#[actix_web::test]
async fn settlement_notification_settles_the_order() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-w1", "PAY-W1")).await;
    let req = notification_request("PAY-W1", "settlement", "105000.00");
    let (status, body) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Processed settlement notification for payment PAY-W1. 1 of 1 orders settled.");
    assert!(is_paid(&db, "order-w1").await);
    assert_eq!(stock_of(&db, "tomato").await, 47);

    // The gateway retries until it sees a 200. Re-deliveries are acknowledged without a second effect.
    let req = notification_request("PAY-W1", "settlement", "105000.00");
    let (status, _) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.fetch_treasury().await.unwrap().total_orders_processed, 1);
    assert_eq!(db.fetch_payouts(None).await.unwrap().len(), 1);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn tampered_notification_is_forbidden() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-w2", "PAY-W2")).await;
    let mut notification = signed_notification("PAY-W2", "settlement", "105000.00");
    notification.gross_amount = "1000.00".to_string();
    let req = TestRequest::post().uri("/payment/notification").set_json(notification);
    let (status, body) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json(&body)["error"].as_str().unwrap().contains("signature"));
    assert!(!is_paid(&db, "order-w2").await);
    assert_eq!(db.fetch_treasury().await.unwrap().total_orders_processed, 0);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn notification_for_unknown_payment_is_not_found() {
    let db = seeded_database().await;
    let req = notification_request("PAY-NOBODY", "settlement", "105000.00");
    let (status, _) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn notifications_from_outside_the_whitelist_are_rejected() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-w3", "PAY-W3")).await;
    let options =
        ServerOptions { gateway_whitelist: Some(vec!["103.208.23.6".parse().unwrap()]), ..Default::default() };
    let peer: SocketAddr = "10.1.1.1:40000".parse().unwrap();
    let req = notification_request("PAY-W3", "settlement", "105000.00").peer_addr(peer);
    let (status, _) = send_with_options(&db, MockPaymentProvider::new(), options.clone(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!is_paid(&db, "order-w3").await);

    let peer: SocketAddr = "103.208.23.6:40000".parse().unwrap();
    let req = notification_request("PAY-W3", "settlement", "105000.00").peer_addr(peer);
    let (status, _) = send_with_options(&db, MockPaymentProvider::new(), options, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_paid(&db, "order-w3").await);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn manual_verify_is_for_admins_only() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-m1", "PAY-M1")).await;
    let req = || TestRequest::post().uri("/payment/manual-verify/order-m1");

    let (status, _) = send(&db, MockPaymentProvider::new(), req()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&db, MockPaymentProvider::new(), as_buyer(req())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!is_paid(&db, "order-m1").await);

    let (status, body) = send(&db, MockPaymentProvider::new(), as_admin(req())).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["order_id"], "order-m1");
    assert_eq!(body["receipt"]["breakdown"]["seller_amount"], 80_000);
    assert_eq!(body["receipt"]["payout"]["store_id"], STORE_1);
    assert!(is_paid(&db, "order-m1").await);

    let (status, body) = send(&db, MockPaymentProvider::new(), as_admin(req())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("already been paid"));

    let req = TestRequest::post().uri("/payment/manual-verify/order-missing");
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn status_poll_settles_a_paid_order() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-p1", "PAY-P1")).await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_payment_status().times(1).returning(|id| Ok(gateway_status(id, "settlement")));
    let req = as_buyer(TestRequest::get().uri("/payment/check-status/order-p1"));
    let (status, body) = send(&db, provider, req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["settled"], true);
    assert_eq!(body["is_paid"], true);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["gateway_status"], "settlement");
    assert!(is_paid(&db, "order-p1").await);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn status_poll_falls_back_to_the_local_status() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-p2", "PAY-P2")).await;
    let mut provider = MockPaymentProvider::new();
    provider
        .expect_payment_status()
        .returning(|_| Err(PaymentProviderError::Unreachable("connection refused".to_string())));
    let req = as_buyer(TestRequest::get().uri("/payment/check-status/order-p2"));
    let (status, body) = send(&db, provider, req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["gateway_reachable"], false);
    assert_eq!(body["settled"], false);
    assert_eq!(body["status"], "awaiting_payment");
    assert!(!is_paid(&db, "order-p2").await);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn status_poll_needs_access_to_the_order() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-p3", "PAY-P3")).await;
    let req = TestRequest::get().uri("/payment/check-status/order-p3");
    let (status, _) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = with_principal(TestRequest::get().uri("/payment/check-status/order-p3"), BUYER_2, "buyer", None);
    let (status, _) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = as_admin(TestRequest::get().uri("/payment/check-status/order-nope"));
    let (status, _) = send(&db, MockPaymentProvider::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    drop_test_database(db).await;
}
