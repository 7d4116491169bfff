use cucumber::World;
use log::*;
use market_common::Secret;
use settlement_engine::{
    db_types::SettlementMode,
    events::EventProducers,
    payment_provider::{GatewayPaymentStatus, PaymentProviderError, PaymentStatusProvider},
    test_utils::{create_database, random_db_path, run_migrations},
    PaymentFlowApi,
    SqliteDatabase,
    TreasuryApi,
};

pub const SERVER_KEY: &str = "SB-Mid-server-cucumber";

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    /// The error message of the last request, if it failed.
    pub last_error: Option<String>,
}

/// The scenarios only exercise pushed notifications and manual verification, so the gateway is never reachable.
#[derive(Debug, Clone, Default)]
pub struct OfflineGateway;

impl PaymentStatusProvider for OfflineGateway {
    async fn payment_status(&self, _payment_id: &str) -> Result<GatewayPaymentStatus, PaymentProviderError> {
        Err(PaymentProviderError::Unreachable("offline".into()))
    }
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub payments: PaymentFlowApi<SqliteDatabase, OfflineGateway>,
    pub treasury: TreasuryApi<SqliteDatabase>,
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Market system not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_mode(&url, 1, SettlementMode::Atomic)
            .await
            .expect("Error creating connection to database");
        debug!("Created database: {url}");
        let secret = Secret::new(SERVER_KEY.to_string());
        let payments = PaymentFlowApi::new(db.clone(), EventProducers::default(), OfflineGateway, secret);
        let treasury = TreasuryApi::new(db.clone());
        Self { db_path: url, db, payments, treasury }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
