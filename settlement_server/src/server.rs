use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_tools::GatewayApi;
use log::*;
use settlement_engine::{
    events::EventProducers,
    payment_provider::PaymentStatusProvider,
    traits::{SettlementDatabase, TreasuryManagement},
    OrderLifecycleApi,
    PaymentFlowApi,
    SqliteDatabase,
    TreasuryApi,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{gateway::GatewayStatusProvider, logging_hooks::create_logging_event_handlers},
    routes::{
        health,
        CheckStatusRoute,
        CompletePayoutRoute,
        FailPayoutRoute,
        ManualVerifyRoute,
        OrderByIdRoute,
        PaymentNotificationRoute,
        PayoutByIdRoute,
        PayoutsRoute,
        TreasuryRoute,
        UpdateOrderStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_mode(&config.database_url, config.max_connections, config.settlement_mode)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database ready. Settlements run in {} mode.", db.mode());
    let gateway = GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let provider = GatewayStatusProvider::new(gateway);
    let handlers = create_logging_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, provider, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<B, P>(
    config: ServerConfig,
    db: B,
    provider: P,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: SettlementDatabase + TreasuryManagement + Send + 'static,
    P: PaymentStatusProvider + Clone + Send + 'static,
{
    let options = ServerOptions::from_config(&config);
    let server_key = config.gateway.server_key.clone();
    let srv = HttpServer::new(move || {
        let payments_api = PaymentFlowApi::new(db.clone(), producers.clone(), provider.clone(), server_key.clone());
        let lifecycle_api = OrderLifecycleApi::new(db.clone(), producers.clone());
        let treasury_api = TreasuryApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(web::Data::new(options.clone()))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(lifecycle_api))
            .app_data(web::Data::new(treasury_api))
            .configure(configure_routes::<B, P>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The APIs the handlers extract must be registered as app data by the caller.
pub fn configure_routes<B, P>(cfg: &mut web::ServiceConfig)
where
    B: SettlementDatabase + TreasuryManagement + 'static,
    P: PaymentStatusProvider + 'static,
{
    cfg.service(health)
        .service(PaymentNotificationRoute::<B, P>::new())
        .service(ManualVerifyRoute::<B, P>::new())
        .service(CheckStatusRoute::<B, P>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new())
        .service(TreasuryRoute::<B>::new())
        .service(PayoutsRoute::<B>::new())
        .service(PayoutByIdRoute::<B>::new())
        .service(CompletePayoutRoute::<B>::new())
        .service(FailPayoutRoute::<B>::new());
}
