use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderId, Payment},
    traits::PromoApiError,
};

/// The transactional heart of the gateway: checkout persistence and the payment state machine that the webhook
/// reconciler drives.
///
/// Implementations must make every mutation here safe under concurrent re-invocation. The settlement methods in
/// particular are the idempotency boundary for duplicate webhook delivery: re-applying a terminal status returns
/// `Ok(None)` rather than an error, and only an actual `Pending -> terminal` transition returns the settled records
/// (which is what gates "exactly once" notification emission upstream).
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Persists the order and its pending payment in a single atomic transaction.
    ///
    /// If `payment.promo_code` is set, a promo reservation keyed by the order id is taken inside the same
    /// transaction: the code is re-validated against its live state (active flag, validity window, usage limit)
    /// and its usage count incremented by exactly one. Any failure rolls the whole checkout back, so neither the
    /// order, the payment, nor the reservation survives a partial insert.
    async fn create_order_with_payment(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), PaymentGatewayError>;

    /// Records the provider's charge reference on a payment after charge creation succeeded.
    async fn attach_provider_ref(&self, payment_id: i64, provider_ref: &str)
        -> Result<Payment, PaymentGatewayError>;

    /// Charge initiation failed: marks the payment `Failed` and releases any promo reservation held by its order.
    /// The order itself is left in place (it is abandoned, not cancelled, since the customer never paid).
    async fn abandon_payment(&self, payment_id: i64) -> Result<Payment, PaymentGatewayError>;

    /// Applies a "charge succeeded" outcome: `Pending -> Completed`.
    ///
    /// Returns `Ok(None)` if the payment is already `Completed` (duplicate delivery; nothing to do), and an error
    /// if it is `Failed` -- the provider never reports success after failure, so that indicates a data problem.
    async fn complete_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError>;

    /// Applies a "charge failed/canceled" outcome: `Pending -> Failed`, the order is cancelled, and the promo
    /// reservation (if any) is released -- all in one transaction.
    ///
    /// Returns `Ok(None)` if the payment is already `Failed`, and an error if it is `Completed`.
    async fn fail_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError>;

    /// Fetches a payment by its internal id (the id used as correlation metadata on provider events).
    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

/// The records as they stand after a settlement transition actually happened.
#[derive(Debug, Clone)]
pub struct PaymentSettled {
    pub order: Order,
    pub payment: Payment,
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested payment (id {0}) does not exist")]
    PaymentNotFound(i64),
    #[error("The requested laundromat (id {0}) does not exist")]
    LaundromatNotFound(i64),
    #[error("Illegal payment status change. {0}")]
    PaymentStatusUpdateError(String),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("The requested order change is forbidden.")]
    OrderModificationForbidden,
    #[error("{0}")]
    PromoError(#[from] PromoApiError),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
