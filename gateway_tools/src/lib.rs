mod api;
mod config;
mod error;

mod data_objects;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::TransactionStatusResponse;
pub use error::GatewayApiError;
