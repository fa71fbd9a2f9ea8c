//! WashPay Engine
//!
//! The WashPay Engine is the core of a laundry pickup-and-delivery marketplace's payment flow. It owns the money
//! math (platform fees, promo discounts), the promo usage ledger, order/payment orchestration against an external
//! payment provider, and the reconciliation of asynchronous provider webhook events.
//!
//! The library is divided into three main sections:
//! 1. Pricing ([`mod@pricing`]). Pure functions over integer cents: the platform fee, promo discount amounts, and
//!    the great-circle distance used for nearest-laundromat matching.
//! 2. Storage traits ([`mod@traits`]) and the SQLite backend ([`mod@sqlite`]) that implements them. You should never
//!    need to access the database directly; use the public API instead. The exception is the data types, which are
//!    defined in the `db_types` module and are public.
//! 3. The engine public API ([`mod@wpe_api`]), chiefly [`OrderFlowApi`], which implements the checkout contract and
//!    the webhook reconciler.
//!
//! The engine also emits events when payments are confirmed or orders are annulled. A simple hook framework
//! ([`mod@events`]) lets the host process subscribe to these and forward them to a notification sink.
pub mod db_types;
pub mod events;
pub mod pricing;
pub mod traits;
mod wpe_api;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use wpe_api::{
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    order_objects::{CheckoutResult, NewOrderRequest, OrderQueryFilter, ReconcileOutcome},
};
