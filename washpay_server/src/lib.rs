//! # WashPay server
//! This module hosts the REST server for the WashPay payment gateway. It is responsible for:
//! * Taking checkout requests from the marketplace apps and running the order flow.
//! * Listening for incoming webhook events from the payment provider and reconciling them.
//! * Exposing promo previews, nearest-laundromat matching and the staff fulfilment endpoints.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
