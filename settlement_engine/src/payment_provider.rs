//! The seam between the engine and the upstream payment gateway.
//!
//! Status polls ask a [`PaymentStatusProvider`] for the authoritative state of a payment. The server wires in an
//! HTTP-backed implementation; tests use mocks.
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("The payment gateway could not be reached: {0}")]
    Unreachable(String),
    #[error("The payment gateway does not know payment {0}")]
    TransactionNotFound(String),
    #[error("The payment gateway sent an invalid response: {0}")]
    InvalidResponse(String),
}

/// The gateway's view of a payment, as raw status strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPaymentStatus {
    pub payment_id: String,
    pub transaction_status: String,
    pub fraud_status: Option<String>,
    pub gross_amount: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait PaymentStatusProvider {
    async fn payment_status(&self, payment_id: &str) -> Result<GatewayPaymentStatus, PaymentProviderError>;
}
