//! `SqliteDatabase` is a concrete implementation of a WashPay engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{create_schema, laundromats, new_pool, orders, payments, promos};
use crate::{
    db_types::{
        Laundromat,
        NewLaundromat,
        NewOrder,
        NewPayment,
        NewPromoCode,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        PaymentStatus,
        PromoCode,
        PromoReservation,
    },
    traits::{
        check_promo,
        check_status_transition,
        LaundromatManagement,
        OrderManagement,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        PaymentSettled,
        PromoApiError,
        PromoLedger,
        ReleaseOutcome,
    },
    wpe_api::order_objects::OrderQueryFilter,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url` and creates the schema if needed.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        create_schema(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_with_payment(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        if let Some(code) = &payment.promo_code {
            promos::reserve_promo(code, &order.order_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order [{}] and payment {} persisted", order.order_id, payment.id);
        Ok((order, payment))
    }

    async fn attach_provider_ref(
        &self,
        payment_id: i64,
        provider_ref: &str,
    ) -> Result<Payment, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::attach_provider_ref(payment_id, provider_ref, &mut conn).await?;
        debug!("🗃️ Payment {payment_id} linked to provider charge {provider_ref}");
        Ok(payment)
    }

    async fn abandon_payment(&self, payment_id: i64) -> Result<Payment, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        let payment = match payments::update_status_if_pending(payment_id, PaymentStatus::Failed, &mut tx).await? {
            Some(p) => p,
            // already in a terminal state, which for an abandoned charge means the work is done
            None => payment,
        };
        // The charge may have settled before the abandon ran (e.g. a success webhook beat an
        // ambiguous client timeout). A Completed payment keeps its promo reservation.
        if payment.status == PaymentStatus::Failed {
            promos::release_promo(&payment.order_id, &mut tx).await?;
            tx.commit().await?;
            warn!(
                "🗃️ Payment {payment_id} for order [{}] abandoned after charge initiation failed",
                payment.order_id
            );
        } else {
            tx.commit().await?;
            info!(
                "🗃️ Payment {payment_id} for order [{}] settled as {} before it could be abandoned. Leaving it be.",
                payment.order_id, payment.status
            );
        }
        Ok(payment)
    }

    async fn complete_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        match payment.status {
            PaymentStatus::Completed => {
                debug!("🗃️ Payment {payment_id} is already Completed. Duplicate event ignored.");
                return Ok(None);
            },
            PaymentStatus::Failed => {
                return Err(PaymentGatewayError::PaymentStatusUpdateError(format!(
                    "Payment {payment_id} is Failed and cannot be completed"
                )));
            },
            PaymentStatus::Pending => {},
        }
        let Some(payment) = payments::update_status_if_pending(payment_id, PaymentStatus::Completed, &mut tx).await?
        else {
            // lost the race to a concurrent reconciler; whatever won owns the side effects
            debug!("🗃️ Payment {payment_id} was settled concurrently. Nothing to do.");
            return Ok(None);
        };
        let order = orders::fetch_order_by_order_id(&payment.order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(payment.order_id.clone()))?;
        tx.commit().await?;
        info!("🗃️ Payment {payment_id} for order [{}] completed. {} charged.", order.order_id, payment.amount);
        Ok(Some(PaymentSettled { order, payment }))
    }

    async fn fail_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        match payment.status {
            PaymentStatus::Failed => {
                debug!("🗃️ Payment {payment_id} is already Failed. Duplicate event ignored.");
                return Ok(None);
            },
            PaymentStatus::Completed => {
                return Err(PaymentGatewayError::PaymentStatusUpdateError(format!(
                    "Payment {payment_id} is Completed and cannot be failed"
                )));
            },
            PaymentStatus::Pending => {},
        }
        let Some(payment) = payments::update_status_if_pending(payment_id, PaymentStatus::Failed, &mut tx).await?
        else {
            debug!("🗃️ Payment {payment_id} was settled concurrently. Nothing to do.");
            return Ok(None);
        };
        let order = orders::update_order_status(&payment.order_id, OrderStatusType::Cancelled, &mut tx).await?;
        promos::release_promo(&payment.order_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment {payment_id} failed. Order [{}] cancelled and promo (if any) released.", order.order_id);
        Ok(Some(PaymentSettled { order, payment }))
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl PromoLedger for SqliteDatabase {
    async fn validate_promo(&self, code: &str, now: DateTime<Utc>) -> Result<PromoCode, PromoApiError> {
        let mut conn = self.pool.acquire().await?;
        let promo = promos::fetch_promo_by_code(code, &mut conn).await?.ok_or(PromoApiError::NotFound)?;
        check_promo(&promo, now)?;
        Ok(promo)
    }

    async fn reserve_promo(&self, code: &str, order_id: &OrderId) -> Result<PromoReservation, PromoApiError> {
        let mut tx = self.pool.begin().await.map_err(|e| PromoApiError::DatabaseError(e.to_string()))?;
        let reservation = promos::reserve_promo(code, order_id, &mut tx).await?;
        tx.commit().await.map_err(|e| PromoApiError::DatabaseError(e.to_string()))?;
        Ok(reservation)
    }

    async fn release_promo(&self, order_id: &OrderId) -> Result<ReleaseOutcome, PromoApiError> {
        let mut tx = self.pool.begin().await.map_err(|e| PromoApiError::DatabaseError(e.to_string()))?;
        let outcome = promos::release_promo(order_id, &mut tx).await?;
        tx.commit().await.map_err(|e| PromoApiError::DatabaseError(e.to_string()))?;
        Ok(outcome)
    }

    async fn fetch_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>, PromoApiError> {
        let mut conn = self.pool.acquire().await?;
        let promo = promos::fetch_promo_by_code(code, &mut conn).await?;
        Ok(promo)
    }

    async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, PromoApiError> {
        let mut conn = self.pool.acquire().await?;
        let promo = promos::insert_promo(promo, &mut conn).await?;
        info!("🎟️ Promo code {} created ({}% up to {})", promo.code, promo.discount_percent, promo.max_discount);
        Ok(promo)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        check_status_transition(order.status, new_status)?;
        let order = orders::update_order_status(order_id, new_status, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order [{order_id}] moved to {new_status}");
        Ok(order)
    }

    async fn assign_driver(&self, order_id: &OrderId, driver_id: &str) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        if order.status.is_terminal() {
            return Err(PaymentGatewayError::OrderModificationForbidden);
        }
        let order = orders::set_driver(order_id, driver_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Driver {driver_id} assigned to order [{order_id}]");
        Ok(order)
    }
}

impl LaundromatManagement for SqliteDatabase {
    async fn fetch_laundromat(&self, id: i64) -> Result<Option<Laundromat>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let laundromat = laundromats::fetch_laundromat(id, &mut conn).await?;
        Ok(laundromat)
    }

    async fn fetch_active_laundromats(&self) -> Result<Vec<Laundromat>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let laundromats = laundromats::fetch_active_laundromats(&mut conn).await?;
        Ok(laundromats)
    }

    async fn insert_laundromat(&self, laundromat: NewLaundromat) -> Result<Laundromat, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let laundromat = laundromats::insert_laundromat(laundromat, &mut conn).await?;
        info!("🗃️ Laundromat {} ({}) registered", laundromat.id, laundromat.name);
        Ok(laundromat)
    }
}
