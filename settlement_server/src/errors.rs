use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use settlement_engine::engine_api::errors::{LifecycleError, PaymentFlowError, SettlementError, TreasuryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingPrincipal => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedPrincipal(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::InvalidSignature => StatusCode::FORBIDDEN,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No principal was supplied with the request.")]
    MissingPrincipal,
    #[error("The principal headers are not in the correct format. {0}")]
    PoorlyFormattedPrincipal(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The notification signature is invalid.")]
    InvalidSignature,
    #[error("Requests from this address are not accepted.")]
    ForbiddenPeer,
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::OrderNotFound(_) | SettlementError::PayoutNotFound(_) => Self::NoRecordFound(e.to_string()),
            SettlementError::AlreadySettled(_) | SettlementError::InvalidOrder { .. } => {
                Self::BadRequest(e.to_string())
            },
            SettlementError::InvalidOrderTransition { .. } | SettlementError::InvalidPayoutTransition { .. } => {
                Self::BadRequest(e.to_string())
            },
            SettlementError::PartialFailure { .. } => {
                error!("💻️ {e}");
                Self::BackendError(e.to_string())
            },
            SettlementError::DatabaseError(_) | SettlementError::TransactionAborted { .. } => {
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::InvalidSignature => Self::AuthenticationError(AuthError::InvalidSignature),
            PaymentFlowError::OrderNotFound(_) | PaymentFlowError::PaymentNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentFlowError::AlreadyPaid(_) => Self::BadRequest(e.to_string()),
            PaymentFlowError::Forbidden(_) => Self::InsufficientPermissions(e.to_string()),
            PaymentFlowError::Settlement(e) => e.into(),
        }
    }
}

impl From<LifecycleError> for ServerError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            LifecycleError::StatusNotAllowed { .. } | LifecycleError::InvalidTransition { .. } => {
                Self::BadRequest(e.to_string())
            },
            LifecycleError::NotOrderOwner(_) => Self::InsufficientPermissions(e.to_string()),
            LifecycleError::Database(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<TreasuryError> for ServerError {
    fn from(e: TreasuryError) -> Self {
        match e {
            TreasuryError::PayoutNotFound(_) => Self::NoRecordFound(e.to_string()),
            TreasuryError::InvalidPayoutTransition { .. } => Self::BadRequest(e.to_string()),
            TreasuryError::Database(_) => Self::BackendError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use settlement_engine::db_types::{OrderId, OrderStatusType};

    use super::*;

    #[test]
    fn payment_flow_errors_map_to_status_codes() {
        let code = |e: PaymentFlowError| ServerError::from(e).status_code();
        assert_eq!(code(PaymentFlowError::InvalidSignature), StatusCode::FORBIDDEN);
        assert_eq!(code(PaymentFlowError::PaymentNotFound("PAY-1".into())), StatusCode::NOT_FOUND);
        assert_eq!(code(PaymentFlowError::AlreadyPaid(OrderId::from("o1"))), StatusCode::BAD_REQUEST);
        assert_eq!(code(PaymentFlowError::Forbidden("no".into())), StatusCode::FORBIDDEN);
        let aborted = SettlementError::TransactionAborted { order_id: OrderId::from("o1"), reason: "boom".into() };
        assert_eq!(code(PaymentFlowError::Settlement(aborted)), StatusCode::INTERNAL_SERVER_ERROR);
        let missing = SettlementError::OrderNotFound(OrderId::from("o1"));
        assert_eq!(code(PaymentFlowError::Settlement(missing)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn lifecycle_errors_map_to_status_codes() {
        let code = |e: LifecycleError| ServerError::from(e).status_code();
        let e = LifecycleError::StatusNotAllowed { role: "buyer".into(), status: "shipped".into() };
        assert_eq!(code(e), StatusCode::BAD_REQUEST);
        let e = LifecycleError::InvalidTransition {
            order_id: OrderId::from("o1"),
            from: OrderStatusType::Delivered,
            to: OrderStatusType::Shipped,
        };
        assert_eq!(code(e), StatusCode::BAD_REQUEST);
        assert_eq!(code(LifecycleError::NotOrderOwner(OrderId::from("o1"))), StatusCode::FORBIDDEN);
    }

    #[test]
    fn error_bodies_are_json() {
        let res = ServerError::NoRecordFound("Payout 7 does not exist".into()).error_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
    }
}
