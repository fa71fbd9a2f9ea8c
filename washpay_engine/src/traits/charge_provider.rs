use serde::{Deserialize, Serialize};
use thiserror::Error;
use wps_common::Cents;

use crate::db_types::OrderId;

/// The external payment provider that charges are created against.
///
/// The engine never talks to the provider's wire format directly; the server crate adapts the concrete client to
/// this trait. Charge creation must be idempotent on `idempotency_key`, so retrying after an ambiguous network
/// failure can never double-charge the customer.
#[allow(async_fn_in_trait)]
pub trait ChargeProvider {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeHandle, ProviderError>;
}

/// Everything the provider needs to create one charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// The total to charge the customer.
    pub amount: Cents,
    pub currency: String,
    /// What the provider withholds from the transfer to the merchant: `amount - merchant_payout`, so the
    /// destination account receives exactly the payout the books record.
    pub application_fee: Cents,
    /// The merchant's payout account with the provider.
    pub destination_account: String,
    /// Correlation metadata echoed back on provider events.
    pub order_id: OrderId,
    pub payment_id: i64,
    /// Derived from the payment id, so a retried charge for the same payment dedupes at the provider.
    pub idempotency_key: String,
}

/// What the provider hands back when a charge is successfully created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeHandle {
    /// The provider's reference for the charge. Stored on the payment row.
    pub provider_ref: String,
    /// Secret the customer's client uses to confirm the charge, if the provider issues one.
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("The payment provider could not be reached: {0}")]
    Unreachable(String),
    #[error("The payment provider rejected the charge: {0}")]
    Rejected(String),
}

/// A normalized provider notification, decoded from the raw webhook payload by the server crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub kind: ProviderEventKind,
    pub order_id: OrderId,
    pub payment_id: i64,
    pub provider_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEventKind {
    ChargeSucceeded,
    ChargeFailed,
    ChargeCanceled,
}
