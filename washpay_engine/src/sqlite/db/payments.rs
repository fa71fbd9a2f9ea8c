use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, OrderId, Payment, PaymentStatus},
    traits::PaymentGatewayError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PaymentGatewayError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                order_id,
                amount,
                platform_fee,
                merchant_payout,
                discount,
                promo_code
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.platform_fee)
    .bind(payment.merchant_payout)
    .bind(payment.discount)
    .bind(payment.promo_code)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Payment {} for order [{}] inserted as Pending", payment.id, payment.order_id);
    Ok(payment)
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub(crate) async fn attach_provider_ref(
    id: i64,
    provider_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let result: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET provider_ref = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(provider_ref)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(PaymentGatewayError::PaymentNotFound(id))
}

/// Moves a payment from `Pending` to the given terminal status.
///
/// The status check lives in the UPDATE's WHERE clause, so two reconcilers racing on the same payment cannot both
/// observe `Pending`: exactly one gets the updated row back, the other gets `None`.
pub(crate) async fn update_status_if_pending(
    id: i64,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentGatewayError> {
    let result: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = 'Pending' \
         RETURNING *",
    )
    .bind(status.to_string())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(result)
}
