use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{config::GatewayConfig, GatewayApiError, TransactionStatusResponse};

/// A thin client for the payment gateway's REST API. Only the transaction-status query is needed: the gateway is the
/// authority on whether a payment has settled.
#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub async fn rest_query<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let response = self
            .client
            .request(method, url)
            .basic_auth(self.config.server_key.reveal(), Some(""))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    GatewayApiError::Unreachable(e.to_string())
                } else {
                    GatewayApiError::RestResponseError(e.to_string())
                }
            })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            if status >= 500 {
                return Err(GatewayApiError::Unreachable(format!("Gateway answered {status}. {message}")));
            }
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// Fetches the authoritative status of the transaction with the given payment id.
    pub async fn transaction_status(&self, payment_id: &str) -> Result<TransactionStatusResponse, GatewayApiError> {
        let path = format!("/v2/{payment_id}/status");
        debug!("Fetching transaction status for payment {payment_id}");
        let result = self.rest_query::<TransactionStatusResponse>(Method::GET, &path).await.map_err(|e| match e {
            GatewayApiError::QueryError { status: 404, .. } => GatewayApiError::TransactionNotFound(payment_id.into()),
            e => e,
        })?;
        if result.is_not_found() {
            return Err(GatewayApiError::TransactionNotFound(payment_id.to_string()));
        }
        info!(
            "Payment {payment_id} has status {} (fraud status {})",
            result.transaction_status.as_deref().unwrap_or("unknown"),
            result.fraud_status.as_deref().unwrap_or("none")
        );
        Ok(result)
    }
}
