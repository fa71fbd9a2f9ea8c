//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod laundromats;
pub mod orders;
pub mod payments;
pub mod promos;

const SQLITE_DB_URL: &str = "sqlite://data/washpay.db";

pub fn db_url() -> String {
    let result = env::var("WPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("WPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Creates the schema if it does not exist yet. Idempotent, so it runs unconditionally at startup.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), SqlxError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS laundromats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            delivery_radius REAL NOT NULL,
            payout_account TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id TEXT NOT NULL UNIQUE,
            customer_id TEXT NOT NULL,
            laundromat_id INTEGER NOT NULL REFERENCES laundromats (id),
            driver_id TEXT,
            status TEXT NOT NULL DEFAULT 'Pending',
            pickup_address TEXT NOT NULL,
            pickup_latitude REAL NOT NULL,
            pickup_longitude REAL NOT NULL,
            scheduled_pickup_at TIMESTAMP NOT NULL,
            service_id TEXT NOT NULL,
            service_name TEXT NOT NULL,
            notes TEXT,
            final_price INTEGER NOT NULL,
            platform_fee INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id TEXT NOT NULL UNIQUE REFERENCES orders (order_id),
            amount INTEGER NOT NULL,
            platform_fee INTEGER NOT NULL,
            merchant_payout INTEGER NOT NULL,
            discount INTEGER NOT NULL DEFAULT 0,
            promo_code TEXT,
            provider_ref TEXT,
            status TEXT NOT NULL DEFAULT 'Pending',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS promo_codes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            discount_percent INTEGER NOT NULL,
            max_discount INTEGER NOT NULL,
            valid_from TIMESTAMP NOT NULL,
            valid_until TIMESTAMP NOT NULL,
            usage_limit INTEGER NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (usage_count >= 0),
            CHECK (usage_count <= usage_limit)
        );
    "#,
    )
    .execute(pool)
    .await?;
    // One reservation per order, enforced by the UNIQUE constraint. This is what makes reserve/release replay-safe.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS promo_reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            promo_id INTEGER NOT NULL REFERENCES promo_codes (id),
            order_id TEXT NOT NULL UNIQUE,
            released INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
