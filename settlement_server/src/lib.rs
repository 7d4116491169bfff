//! # Marketplace settlement server
//! This crate hosts the HTTP face of the settlement engine. It is responsible for:
//! * Receiving signed payment notifications from the payment gateway and settling the orders they confirm.
//! * Letting administrators settle orders manually, and buyers, sellers and admins poll the gateway for a payment.
//! * Moving orders through their lifecycle (shipping, delivery, cancellation).
//! * Exposing the treasury ledger and the payout lifecycle to administrators.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
