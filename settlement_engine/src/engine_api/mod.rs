mod order_lifecycle_api;
mod payment_flow_api;
mod settlement_api;
mod treasury_api;

pub mod errors;
pub mod payment_objects;
pub mod settlement_objects;

pub use order_lifecycle_api::{allowed_targets, is_valid_transition, OrderLifecycleApi};
pub use payment_flow_api::PaymentFlowApi;
pub use settlement_api::SettlementApi;
pub use treasury_api::TreasuryApi;
