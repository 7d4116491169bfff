//! Storage traits for the settlement engine.
//!
//! A backend implements these traits to act as the persistence layer for the engine's APIs. The SQLite backend in
//! [`crate::db::sqlite`] is the reference implementation.
mod cart_management;
mod catalog_management;
mod data_objects;
mod order_management;
mod settlement_database;
mod treasury_management;

pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{InsertOrderResult, InsertPayoutResult};
pub use order_management::OrderManagement;
pub use settlement_database::SettlementDatabase;
pub use treasury_management::TreasuryManagement;
