use serde::{Deserialize, Serialize};

/// The body returned by the gateway's transaction-status endpoint. The gateway reports application-level errors
/// (e.g. an unknown transaction) in `status_code` while still answering with HTTP 200, so most fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionStatusResponse {
    pub status_code: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<String>,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub gross_amount: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
}

impl TransactionStatusResponse {
    pub fn is_not_found(&self) -> bool {
        self.status_code == "404"
    }
}
