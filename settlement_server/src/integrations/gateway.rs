use gateway_tools::{GatewayApi, GatewayApiError};
use log::*;
use settlement_engine::payment_provider::{GatewayPaymentStatus, PaymentProviderError, PaymentStatusProvider};

/// Answers status polls by querying the payment gateway's REST API.
#[derive(Clone)]
pub struct GatewayStatusProvider {
    api: GatewayApi,
}

impl GatewayStatusProvider {
    pub fn new(api: GatewayApi) -> Self {
        Self { api }
    }
}

impl PaymentStatusProvider for GatewayStatusProvider {
    async fn payment_status(&self, payment_id: &str) -> Result<GatewayPaymentStatus, PaymentProviderError> {
        let response = self.api.transaction_status(payment_id).await.map_err(|e| {
            debug!("🔍️ Gateway status query for {payment_id} failed. {e}");
            provider_error(payment_id, e)
        })?;
        let transaction_status = response.transaction_status.ok_or_else(|| {
            PaymentProviderError::InvalidResponse(format!("No transaction status was given for payment {payment_id}"))
        })?;
        Ok(GatewayPaymentStatus {
            payment_id: payment_id.to_string(),
            transaction_status,
            fraud_status: response.fraud_status,
            gross_amount: response.gross_amount,
        })
    }
}

fn provider_error(payment_id: &str, e: GatewayApiError) -> PaymentProviderError {
    match e {
        GatewayApiError::TransactionNotFound(_) => PaymentProviderError::TransactionNotFound(payment_id.to_string()),
        GatewayApiError::Unreachable(s) | GatewayApiError::Initialization(s) => PaymentProviderError::Unreachable(s),
        GatewayApiError::RestResponseError(s) | GatewayApiError::JsonError(s) => {
            PaymentProviderError::InvalidResponse(s)
        },
        GatewayApiError::QueryError { status, message } => {
            PaymentProviderError::InvalidResponse(format!("Error {status}. {message}"))
        },
    }
}
