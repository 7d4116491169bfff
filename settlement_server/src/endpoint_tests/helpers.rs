use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
};
use log::debug;
use market_common::Secret;
use serde_json::Value;
use settlement_engine::{
    db_types::SettlementMode,
    engine_api::payment_objects::PaymentNotification,
    events::EventProducers,
    helpers::notification_signature,
    test_utils::{
        fixtures::{seed_products, BUYER_1, STORE_1},
        test_database,
    },
    OrderLifecycleApi,
    PaymentFlowApi,
    SqliteDatabase,
    TreasuryApi,
};

use super::mocks::MockPaymentProvider;
use crate::{
    auth::{PRINCIPAL_ID_HEADER, PRINCIPAL_ROLES_HEADER, PRINCIPAL_STORE_HEADER},
    config::ServerOptions,
    server::configure_routes,
};

pub const SERVER_KEY: &str = "SB-Mid-server-endpoint-tests";

pub async fn seeded_database() -> SqliteDatabase {
    let db = test_database(SettlementMode::Atomic).await;
    seed_products(&db).await;
    db
}

/// Sends the request to an app backed by `db` and returns the status and body. Errors raised by middleware are
/// converted into responses, as the server would.
pub async fn send_with_options(
    db: &SqliteDatabase,
    provider: MockPaymentProvider,
    options: ServerOptions,
    req: TestRequest,
) -> (StatusCode, String) {
    let payments_api =
        PaymentFlowApi::new(db.clone(), EventProducers::default(), provider, Secret::new(SERVER_KEY.to_string()));
    let app = App::new()
        .app_data(web::Data::new(options))
        .app_data(web::Data::new(payments_api))
        .app_data(web::Data::new(OrderLifecycleApi::new(db.clone(), EventProducers::default())))
        .app_data(web::Data::new(TreasuryApi::new(db.clone())))
        .configure(configure_routes::<SqliteDatabase, MockPaymentProvider>);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = to_bytes(res.into_body()).await.unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub async fn send(db: &SqliteDatabase, provider: MockPaymentProvider, req: TestRequest) -> (StatusCode, String) {
    send_with_options(db, provider, ServerOptions::default(), req).await
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Not JSON: {body}. {e}"))
}

pub fn with_principal(req: TestRequest, id: &str, roles: &str, store_id: Option<&str>) -> TestRequest {
    let req = req.insert_header((PRINCIPAL_ID_HEADER, id)).insert_header((PRINCIPAL_ROLES_HEADER, roles));
    match store_id {
        Some(store_id) => req.insert_header((PRINCIPAL_STORE_HEADER, store_id)),
        None => req,
    }
}

pub fn as_admin(req: TestRequest) -> TestRequest {
    with_principal(req, "admin-1", "admin", None)
}

pub fn as_buyer(req: TestRequest) -> TestRequest {
    with_principal(req, BUYER_1, "buyer", None)
}

pub fn as_seller(req: TestRequest) -> TestRequest {
    with_principal(req, "seller-1", "seller", Some(STORE_1))
}

pub fn signed_notification(payment_id: &str, transaction_status: &str, gross_amount: &str) -> PaymentNotification {
    PaymentNotification {
        order_id: payment_id.to_string(),
        transaction_status: transaction_status.to_string(),
        status_code: "200".to_string(),
        gross_amount: gross_amount.to_string(),
        signature_key: notification_signature(payment_id, "200", gross_amount, SERVER_KEY),
        payment_type: Some("bank_transfer".to_string()),
        ..Default::default()
    }
}
