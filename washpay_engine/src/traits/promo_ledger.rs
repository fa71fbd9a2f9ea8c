use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewPromoCode, OrderId, PromoCode, PromoReservation};

/// The promo-code usage ledger.
///
/// Usage accounting follows the payment lifecycle, not the quote step: a reservation is taken when an order is
/// actually created and released again if its payment later fails or is cancelled, so abandoned carts cannot
/// exhaust a code. Reservations are keyed by order id, which makes both `reserve` and `release` safe to replay.
///
/// Implementations must serialize counter mutations per code (row-level locking or a compare-and-swap on
/// `usage_count`) so that `0 <= usage_count <= usage_limit` holds even when two orders race for the last use.
#[allow(async_fn_in_trait)]
pub trait PromoLedger {
    /// Checks a code against its live state without consuming anything. Used for pre-checkout previews.
    async fn validate_promo(&self, code: &str, now: DateTime<Utc>) -> Result<PromoCode, PromoApiError>;

    /// Consumes one unit of the code's allowance on behalf of `order_id`. Replay-safe: if this order already holds
    /// a reservation, the existing one is returned and the counter is untouched.
    async fn reserve_promo(&self, code: &str, order_id: &OrderId) -> Result<PromoReservation, PromoApiError>;

    /// Returns one unit of allowance if `order_id` holds an unreleased reservation. Double release and releasing
    /// for an order that never reserved are both no-ops, reported in the outcome.
    async fn release_promo(&self, order_id: &OrderId) -> Result<ReleaseOutcome, PromoApiError>;

    /// Fetches a code's record (case-insensitively) regardless of its validity.
    async fn fetch_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>, PromoApiError>;

    /// Creates a new promo code. The code is stored uppercase.
    async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, PromoApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// A reservation was released and the usage count decremented.
    Released,
    /// The reservation had already been released. No-op.
    AlreadyReleased,
    /// The order never reserved a promo. No-op.
    NoReservation,
}

#[derive(Debug, Clone, Error)]
pub enum PromoApiError {
    #[error("Promo code not found")]
    NotFound,
    #[error("This promo code is not valid yet")]
    NotYetValid,
    #[error("This promo code has expired")]
    Expired,
    #[error("This promo code has reached its usage limit")]
    UsageLimitReached,
    #[error("A promo code with this code already exists")]
    CodeAlreadyExists,
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PromoApiError {
    fn from(e: sqlx::Error) -> Self {
        PromoApiError::DatabaseError(e.to_string())
    }
}

/// The single source of truth for promo validity: active flag, validity window, and remaining allowance.
/// Inactive codes are indistinguishable from missing ones, so customers can't probe for retired codes.
pub fn check_promo(promo: &PromoCode, now: DateTime<Utc>) -> Result<(), PromoApiError> {
    if !promo.active {
        return Err(PromoApiError::NotFound);
    }
    if now < promo.valid_from {
        return Err(PromoApiError::NotYetValid);
    }
    if now > promo.valid_until {
        return Err(PromoApiError::Expired);
    }
    if promo.usage_count >= promo.usage_limit {
        return Err(PromoApiError::UsageLimitReached);
    }
    Ok(())
}
