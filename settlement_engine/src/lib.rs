//! Marketplace Settlement Engine
//!
//! The settlement engine turns confirmed payments into their financial effects: an order is marked paid, stock is
//! reduced, the platform treasury is credited and a payout to the selling store is recorded. It does this exactly once
//! per order, no matter how many times, or through how many entry points, a payment is reported.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and [`SqliteDatabase`]). The traits describe what the engine needs from a backend. SQLite
//!    is the supported backend. The data types that are stored are defined in [`mod@db_types`] and are public.
//! 2. The engine's public API ([`mod@engine_api`]):
//!    * [`SettlementApi`] runs settlements.
//!    * [`PaymentFlowApi`] receives gateway notifications, manual verifications and status polls, and hands them to
//!      the settlement API.
//!    * [`OrderLifecycleApi`] ships, delivers and cancels orders.
//!    * [`TreasuryApi`] reads the ledger and completes or fails payouts.
//! 3. The payment gateway seam ([`mod@payment_provider`]), implemented by the server.
//!
//! The engine also emits events when orders are settled or change status. See [`mod@events`] for how to hook into them.
mod db;

pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod helpers;
pub mod payment_provider;
#[cfg(feature = "sqlite")]
pub mod test_utils;

pub use db::traits;
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, UnitOfWork};
pub use engine_api::{OrderLifecycleApi, PaymentFlowApi, SettlementApi, TreasuryApi};
pub use traits::{
    CartManagement,
    CatalogManagement,
    InsertOrderResult,
    InsertPayoutResult,
    OrderManagement,
    SettlementDatabase,
    TreasuryManagement,
};
