use sqlx::SqliteConnection;

use crate::{
    db_types::{Laundromat, NewLaundromat},
    traits::PaymentGatewayError,
};

pub async fn fetch_laundromat(id: i64, conn: &mut SqliteConnection) -> Result<Option<Laundromat>, sqlx::Error> {
    let laundromat = sqlx::query_as("SELECT * FROM laundromats WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(laundromat)
}

pub async fn fetch_active_laundromats(conn: &mut SqliteConnection) -> Result<Vec<Laundromat>, sqlx::Error> {
    let laundromats =
        sqlx::query_as("SELECT * FROM laundromats WHERE active = 1 ORDER BY id ASC").fetch_all(conn).await?;
    Ok(laundromats)
}

pub async fn insert_laundromat(
    laundromat: NewLaundromat,
    conn: &mut SqliteConnection,
) -> Result<Laundromat, PaymentGatewayError> {
    let laundromat = sqlx::query_as(
        r#"
            INSERT INTO laundromats (name, address, latitude, longitude, delivery_radius, payout_account)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(laundromat.name)
    .bind(laundromat.address)
    .bind(laundromat.latitude)
    .bind(laundromat.longitude)
    .bind(laundromat.delivery_radius)
    .bind(laundromat.payout_account)
    .fetch_one(conn)
    .await?;
    Ok(laundromat)
}
