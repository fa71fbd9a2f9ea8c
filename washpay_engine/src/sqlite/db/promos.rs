use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPromoCode, OrderId, PromoCode, PromoReservation},
    traits::{check_promo, PromoApiError, ReleaseOutcome},
};

pub async fn fetch_promo_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<PromoCode>, sqlx::Error> {
    let promo = sqlx::query_as("SELECT * FROM promo_codes WHERE code = $1")
        .bind(code.to_uppercase())
        .fetch_optional(conn)
        .await?;
    Ok(promo)
}

pub async fn insert_promo(promo: NewPromoCode, conn: &mut SqliteConnection) -> Result<PromoCode, PromoApiError> {
    let code = promo.code.to_uppercase();
    if fetch_promo_by_code(&code, conn).await?.is_some() {
        return Err(PromoApiError::CodeAlreadyExists);
    }
    let promo = sqlx::query_as(
        r#"
            INSERT INTO promo_codes (code, discount_percent, max_discount, valid_from, valid_until, usage_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(code)
    .bind(promo.discount_percent)
    .bind(promo.max_discount)
    .bind(promo.valid_from)
    .bind(promo.valid_until)
    .bind(promo.usage_limit)
    .fetch_one(conn)
    .await?;
    Ok(promo)
}

pub async fn fetch_reservation(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PromoReservation>, sqlx::Error> {
    let reservation = sqlx::query_as("SELECT * FROM promo_reservations WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(reservation)
}

/// Consumes one unit of the code's allowance on behalf of `order_id`.
///
/// If the order already holds a reservation (a retried checkout), the existing row is returned and the counter is
/// left alone. Otherwise the code is re-validated against its live state and the counter incremented with a guarded
/// UPDATE (`usage_count < usage_limit` in the WHERE clause), so a race for the last use resolves to exactly one
/// winner; the loser sees no row updated and gets `UsageLimitReached`.
///
/// Run this inside the checkout transaction so a failure further along rolls the reservation back too.
pub async fn reserve_promo(
    code: &str,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<PromoReservation, PromoApiError> {
    let promo = fetch_promo_by_code(code, conn).await?.ok_or(PromoApiError::NotFound)?;
    if let Some(existing) = fetch_reservation(order_id, conn).await? {
        debug!("🎟️ Order [{order_id}] already holds a reservation for {}. Nothing to do.", promo.code);
        return Ok(existing);
    }
    check_promo(&promo, Utc::now())?;
    let updated: Option<PromoCode> = sqlx::query_as(
        "UPDATE promo_codes SET usage_count = usage_count + 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
         usage_count < usage_limit RETURNING *",
    )
    .bind(promo.id)
    .fetch_optional(&mut *conn)
    .await?;
    let promo = updated.ok_or(PromoApiError::UsageLimitReached)?;
    let reservation: PromoReservation = sqlx::query_as(
        "INSERT INTO promo_reservations (promo_id, order_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(promo.id)
    .bind(order_id.as_str())
    .fetch_one(conn)
    .await?;
    debug!("🎟️ Reserved {} for order [{order_id}] ({}/{} used)", promo.code, promo.usage_count, promo.usage_limit);
    Ok(reservation)
}

/// Returns one unit of allowance if `order_id` holds an unreleased reservation.
///
/// Flipping `released` is guarded on `released = 0`, so a double release finds no row to flip and never decrements
/// the counter a second time. The decrement itself is guarded on `usage_count > 0` as a floor.
pub async fn release_promo(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<ReleaseOutcome, PromoApiError> {
    if fetch_reservation(order_id, conn).await?.is_none() {
        return Ok(ReleaseOutcome::NoReservation);
    }
    let released: Option<(i64,)> = sqlx::query_as(
        "UPDATE promo_reservations SET released = 1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 AND \
         released = 0 RETURNING promo_id",
    )
    .bind(order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    let Some((promo_id,)) = released else {
        return Ok(ReleaseOutcome::AlreadyReleased);
    };
    sqlx::query(
        "UPDATE promo_codes SET usage_count = usage_count - 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
         usage_count > 0",
    )
    .bind(promo_id)
    .execute(conn)
    .await?;
    debug!("🎟️ Released promo reservation for order [{order_id}]");
    Ok(ReleaseOutcome::Released)
}
