//! # Storage and provider contracts
//!
//! This module defines the interface contracts that the engine's backends implement.
//!
//! * [`PaymentGatewayDatabase`] is the transactional core: atomic order+payment checkout and the idempotent
//!   payment settlement transitions the webhook reconciler drives.
//! * [`PromoLedger`] is the promo-code usage ledger: validation, per-order reservations and releases.
//! * [`OrderManagement`] provides order queries and the staff-facing fulfilment mutations.
//! * [`LaundromatManagement`] provides laundromat lookups for checkout and nearest-shop matching.
//! * [`ChargeProvider`] abstracts the external payment provider that charges are created against.
//!
//! [`MarketplaceDatabase`] is a convenience umbrella over the four storage traits; the SQLite backend (and the
//! in-memory backend used by tests) implement all of them.
mod charge_provider;
mod laundromat_management;
mod order_management;
mod payment_gateway_database;
mod promo_ledger;

pub use charge_provider::{ChargeHandle, ChargeProvider, ChargeRequest, ProviderError, ProviderEvent, ProviderEventKind};
pub use laundromat_management::LaundromatManagement;
pub use order_management::OrderManagement;
pub(crate) use order_management::check_status_transition;
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError, PaymentSettled};
pub use promo_ledger::{check_promo, PromoApiError, PromoLedger, ReleaseOutcome};

/// Everything a storage backend must provide to power the full order flow.
pub trait MarketplaceDatabase:
    PaymentGatewayDatabase + PromoLedger + OrderManagement + LaundromatManagement
{
}

impl<T> MarketplaceDatabase for T where T: PaymentGatewayDatabase + PromoLedger + OrderManagement + LaundromatManagement
{}
