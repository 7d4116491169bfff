use mockall::mock;
use settlement_engine::payment_provider::{GatewayPaymentStatus, PaymentProviderError, PaymentStatusProvider};

mock! {
    pub PaymentProvider {}
    impl PaymentStatusProvider for PaymentProvider {
        async fn payment_status(&self, payment_id: &str) -> Result<GatewayPaymentStatus, PaymentProviderError>;
    }
}

pub fn gateway_status(payment_id: &str, transaction_status: &str) -> GatewayPaymentStatus {
    GatewayPaymentStatus {
        payment_id: payment_id.to_string(),
        transaction_status: transaction_status.to_string(),
        fraud_status: Some("accept".to_string()),
        gross_amount: Some("105000.00".to_string()),
    }
}
