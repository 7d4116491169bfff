use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OrderId, OrderStatusType},
    engine_api::settlement_objects::SettlementReceipt,
};

//--------------------------------------  TransactionStatus    ---------------------------------------------------------
/// Transaction states reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
    Refund,
    PartialRefund,
    Authorize,
    Other(String),
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "capture" => Self::Capture,
            "settlement" => Self::Settlement,
            "pending" => Self::Pending,
            "deny" => Self::Deny,
            "cancel" => Self::Cancel,
            "expire" => Self::Expire,
            "refund" => Self::Refund,
            "partial_refund" => Self::PartialRefund,
            "authorize" => Self::Authorize,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capture => write!(f, "capture"),
            Self::Settlement => write!(f, "settlement"),
            Self::Pending => write!(f, "pending"),
            Self::Deny => write!(f, "deny"),
            Self::Cancel => write!(f, "cancel"),
            Self::Expire => write!(f, "expire"),
            Self::Refund => write!(f, "refund"),
            Self::PartialRefund => write!(f, "partial_refund"),
            Self::Authorize => write!(f, "authorize"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
    Other(String),
}

impl From<&str> for FraudStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Self::Accept,
            "challenge" => Self::Challenge,
            "deny" => Self::Deny,
            other => Self::Other(other.to_string()),
        }
    }
}

//--------------------------------------    PaymentAction      ---------------------------------------------------------
/// What the engine does with an order in response to a gateway status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    /// The money has arrived. Run the settlement.
    Settle,
    /// Payment is under way or under review. Record the status only.
    RecordPending,
    /// The payment failed. Cancel the order unless it is still awaiting payment.
    Cancel,
    /// Anything else is recorded on the order and otherwise ignored.
    RecordOnly,
}

impl PaymentAction {
    /// A capture without a fraud verdict is treated as accepted.
    pub fn for_status(status: &TransactionStatus, fraud: Option<&FraudStatus>) -> Self {
        match (status, fraud) {
            (TransactionStatus::Settlement, _) => Self::Settle,
            (TransactionStatus::Capture, None | Some(FraudStatus::Accept)) => Self::Settle,
            (TransactionStatus::Capture, Some(FraudStatus::Deny)) => Self::Cancel,
            (TransactionStatus::Capture, Some(_)) => Self::RecordPending,
            (TransactionStatus::Pending, _) => Self::RecordPending,
            (TransactionStatus::Cancel | TransactionStatus::Deny | TransactionStatus::Expire, _) => Self::Cancel,
            _ => Self::RecordOnly,
        }
    }

    pub fn from_raw(transaction_status: &str, fraud_status: Option<&str>) -> Self {
        let status = TransactionStatus::from(transaction_status);
        let fraud = fraud_status.filter(|s| !s.trim().is_empty()).map(FraudStatus::from);
        Self::for_status(&status, fraud.as_ref())
    }
}

//--------------------------------------  PaymentNotification  ---------------------------------------------------------
/// An inbound payment notification. `order_id` is the gateway's payment id, which may cover several local orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
}

impl PaymentNotification {
    pub fn action(&self) -> PaymentAction {
        PaymentAction::from_raw(&self.transaction_status, self.fraud_status.as_deref())
    }
}

/// What happened to one order as a result of a notification or a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentOutcome {
    Settled,
    AlreadySettled,
    StatusRecorded,
    Canceled,
    /// Nothing was changed. The string says why.
    Ignored(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderNotificationResult {
    pub order_id: OrderId,
    pub outcome: OrderPaymentOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub payment_id: String,
    pub transaction_status: String,
    pub action: PaymentAction,
    pub orders: Vec<OrderNotificationResult>,
}

impl NotificationResult {
    pub fn settled_count(&self) -> usize {
        self.orders.iter().filter(|o| o.outcome == OrderPaymentOutcome::Settled).count()
    }
}

//--------------------------------------   StatusCheckResult   ---------------------------------------------------------
/// The answer to a status poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheckResult {
    pub order_id: OrderId,
    pub payment_id: Option<String>,
    pub status: OrderStatusType,
    pub is_paid: bool,
    /// The latest payment status recorded locally.
    pub payment_status: Option<String>,
    /// The gateway's transaction status. `None` if the gateway was not consulted or could not be reached.
    pub gateway_status: Option<String>,
    pub gateway_reachable: bool,
    /// Whether this poll settled the order.
    pub settled: bool,
    /// Orders sharing the payment id that this poll settled, including the polled order.
    pub settled_orders: Vec<OrderId>,
}

/// The answer to a manual verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualVerifyResult {
    pub order_id: OrderId,
    pub receipt: SettlementReceipt,
}
