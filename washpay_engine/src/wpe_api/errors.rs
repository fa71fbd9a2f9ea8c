use thiserror::Error;

use crate::traits::{PaymentGatewayError, PromoApiError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The requested laundromat (id {0}) does not exist or is not accepting orders")]
    LaundromatNotFound(i64),
    #[error("Laundromat {0} has no payout account configured and cannot receive payments")]
    PayoutAccountMissing(i64),
    #[error("{0}")]
    Promo(#[from] PromoApiError),
    #[error("The payment could not be initiated with the provider: {0}")]
    PaymentInitiationFailed(String),
    #[error("{0}")]
    Database(#[from] PaymentGatewayError),
}
