//! Shared test support: an in-memory implementation of the storage traits and a scriptable charge provider.
//!
//! The in-memory backend implements the same replay-safety contracts as the SQLite backend (guarded settlement
//! transitions, per-order promo reservations), with a single async mutex standing in for database transactions.
#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use washpay_engine::{
    db_types::{
        Cents,
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
        ChargeHandle,
        ChargeProvider,
        ChargeRequest,
        LaundromatManagement,
        OrderManagement,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        PaymentSettled,
        PromoApiError,
        PromoLedger,
        ProviderError,
        ReleaseOutcome,
    },
    OrderQueryFilter,
};

#[derive(Default)]
pub struct Inner {
    pub orders: Vec<Order>,
    pub payments: Vec<Payment>,
    pub promos: Vec<PromoCode>,
    pub reservations: Vec<PromoReservation>,
    pub laundromats: Vec<Laundromat>,
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_laundromat(&self, shop: NewLaundromat) -> Laundromat {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let laundromat = Laundromat {
            id: inner.laundromats.len() as i64 + 1,
            name: shop.name,
            address: shop.address,
            latitude: shop.latitude,
            longitude: shop.longitude,
            delivery_radius: shop.delivery_radius,
            payout_account: shop.payout_account,
            active: true,
            created_at: now,
            updated_at: now,
        };
        inner.laundromats.push(laundromat.clone());
        laundromat
    }

    pub async fn deactivate_laundromat(&self, id: i64) {
        let mut inner = self.inner.lock().await;
        if let Some(shop) = inner.laundromats.iter_mut().find(|l| l.id == id) {
            shop.active = false;
        }
    }

    pub async fn seed_promo(&self, promo: NewPromoCode) -> PromoCode {
        self.create_promo(promo).await.expect("promo seed failed")
    }

    pub async fn promo_usage(&self, code: &str) -> i64 {
        let inner = self.inner.lock().await;
        inner.promos.iter().find(|p| p.code == code.to_uppercase()).map(|p| p.usage_count).unwrap_or(-1)
    }

    pub async fn reservation_for(&self, order_id: &OrderId) -> Option<PromoReservation> {
        let inner = self.inner.lock().await;
        inner.reservations.iter().find(|r| &r.order_id == order_id).cloned()
    }

    fn reserve_locked(inner: &mut Inner, code: &str, order_id: &OrderId) -> Result<PromoReservation, PromoApiError> {
        let code = code.to_uppercase();
        let promo = inner.promos.iter().find(|p| p.code == code).cloned().ok_or(PromoApiError::NotFound)?;
        if let Some(existing) = inner.reservations.iter().find(|r| &r.order_id == order_id) {
            return Ok(existing.clone());
        }
        check_promo(&promo, Utc::now())?;
        let promo = inner.promos.iter_mut().find(|p| p.code == code).unwrap();
        if promo.usage_count >= promo.usage_limit {
            return Err(PromoApiError::UsageLimitReached);
        }
        promo.usage_count += 1;
        let promo_id = promo.id;
        let now = Utc::now();
        let reservation = PromoReservation {
            id: inner.reservations.len() as i64 + 1,
            promo_id,
            order_id: order_id.clone(),
            released: false,
            created_at: now,
            updated_at: now,
        };
        inner.reservations.push(reservation.clone());
        Ok(reservation)
    }

    fn release_locked(inner: &mut Inner, order_id: &OrderId) -> ReleaseOutcome {
        let Some(reservation) = inner.reservations.iter_mut().find(|r| &r.order_id == order_id) else {
            return ReleaseOutcome::NoReservation;
        };
        if reservation.released {
            return ReleaseOutcome::AlreadyReleased;
        }
        reservation.released = true;
        let promo_id = reservation.promo_id;
        if let Some(promo) = inner.promos.iter_mut().find(|p| p.id == promo_id) {
            if promo.usage_count > 0 {
                promo.usage_count -= 1;
            }
        }
        ReleaseOutcome::Released
    }
}

impl PaymentGatewayDatabase for MemoryDatabase {
    fn url(&self) -> &str {
        "memory://test"
    }

    async fn create_order_with_payment(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        if inner.orders.iter().any(|o| o.order_id == order.order_id) {
            return Err(PaymentGatewayError::OrderAlreadyExists(order.order_id));
        }
        // the reservation happens first so a promo failure leaves no partial records behind
        if let Some(code) = &payment.promo_code {
            Self::reserve_locked(&mut inner, code, &order.order_id)?;
        }
        let now = Utc::now();
        let order = Order {
            id: inner.orders.len() as i64 + 1,
            order_id: order.order_id,
            customer_id: order.customer_id,
            laundromat_id: order.laundromat_id,
            driver_id: None,
            status: OrderStatusType::Pending,
            pickup_address: order.pickup_address,
            pickup_latitude: order.pickup_latitude,
            pickup_longitude: order.pickup_longitude,
            scheduled_pickup_at: order.scheduled_pickup_at,
            service_id: order.service_id,
            service_name: order.service_name,
            notes: order.notes,
            final_price: order.final_price,
            platform_fee: order.platform_fee,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment {
            id: inner.payments.len() as i64 + 1,
            order_id: payment.order_id,
            amount: payment.amount,
            platform_fee: payment.platform_fee,
            merchant_payout: payment.merchant_payout,
            discount: payment.discount,
            promo_code: payment.promo_code,
            provider_ref: None,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.orders.push(order.clone());
        inner.payments.push(payment.clone());
        Ok((order, payment))
    }

    async fn attach_provider_ref(&self, payment_id: i64, provider_ref: &str) -> Result<Payment, PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        let payment = inner
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        payment.provider_ref = Some(provider_ref.to_string());
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn abandon_payment(&self, payment_id: i64) -> Result<Payment, PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        let payment = inner
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        if payment.status == PaymentStatus::Pending {
            payment.status = PaymentStatus::Failed;
            payment.updated_at = Utc::now();
        }
        let payment = payment.clone();
        // A payment that settled as Completed before the abandon ran keeps its promo reservation.
        if payment.status == PaymentStatus::Failed {
            Self::release_locked(&mut inner, &payment.order_id);
        }
        Ok(payment)
    }

    async fn complete_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        let payment = inner
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        match payment.status {
            PaymentStatus::Completed => return Ok(None),
            PaymentStatus::Failed => {
                return Err(PaymentGatewayError::PaymentStatusUpdateError(format!(
                    "Payment {payment_id} is Failed and cannot be completed"
                )));
            },
            PaymentStatus::Pending => {},
        }
        payment.status = PaymentStatus::Completed;
        payment.updated_at = Utc::now();
        let payment = payment.clone();
        let order = inner
            .orders
            .iter()
            .find(|o| o.order_id == payment.order_id)
            .cloned()
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(payment.order_id.clone()))?;
        Ok(Some(PaymentSettled { order, payment }))
    }

    async fn fail_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        let payment = inner
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        match payment.status {
            PaymentStatus::Failed => return Ok(None),
            PaymentStatus::Completed => {
                return Err(PaymentGatewayError::PaymentStatusUpdateError(format!(
                    "Payment {payment_id} is Completed and cannot be failed"
                )));
            },
            PaymentStatus::Pending => {},
        }
        payment.status = PaymentStatus::Failed;
        payment.updated_at = Utc::now();
        let payment = payment.clone();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.order_id == payment.order_id)
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(payment.order_id.clone()))?;
        order.status = OrderStatusType::Cancelled;
        order.updated_at = Utc::now();
        let order = order.clone();
        Self::release_locked(&mut inner, &payment.order_id);
        Ok(Some(PaymentSettled { order, payment }))
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError> {
        let inner = self.inner.lock().await;
        Ok(inner.payments.iter().find(|p| p.id == payment_id).cloned())
    }
}

impl PromoLedger for MemoryDatabase {
    async fn validate_promo(
        &self,
        code: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<PromoCode, PromoApiError> {
        let inner = self.inner.lock().await;
        let promo =
            inner.promos.iter().find(|p| p.code == code.to_uppercase()).cloned().ok_or(PromoApiError::NotFound)?;
        check_promo(&promo, now)?;
        Ok(promo)
    }

    async fn reserve_promo(&self, code: &str, order_id: &OrderId) -> Result<PromoReservation, PromoApiError> {
        let mut inner = self.inner.lock().await;
        Self::reserve_locked(&mut inner, code, order_id)
    }

    async fn release_promo(&self, order_id: &OrderId) -> Result<ReleaseOutcome, PromoApiError> {
        let mut inner = self.inner.lock().await;
        Ok(Self::release_locked(&mut inner, order_id))
    }

    async fn fetch_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>, PromoApiError> {
        let inner = self.inner.lock().await;
        Ok(inner.promos.iter().find(|p| p.code == code.to_uppercase()).cloned())
    }

    async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, PromoApiError> {
        let mut inner = self.inner.lock().await;
        let code = promo.code.to_uppercase();
        if inner.promos.iter().any(|p| p.code == code) {
            return Err(PromoApiError::CodeAlreadyExists);
        }
        let now = Utc::now();
        let promo = PromoCode {
            id: inner.promos.len() as i64 + 1,
            code,
            discount_percent: promo.discount_percent,
            max_discount: promo.max_discount,
            valid_from: promo.valid_from,
            valid_until: promo.valid_until,
            usage_limit: promo.usage_limit,
            usage_count: 0,
            active: true,
            created_at: now,
            updated_at: now,
        };
        inner.promos.push(promo.clone());
        Ok(promo)
    }
}

impl OrderManagement for MemoryDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.iter().find(|o| &o.order_id == order_id).cloned())
    }

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, PaymentGatewayError> {
        let inner = self.inner.lock().await;
        Ok(inner.payments.iter().find(|p| &p.order_id == order_id).cloned())
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError> {
        let inner = self.inner.lock().await;
        let orders = inner
            .orders
            .iter()
            .filter(|o| query.customer_id.as_ref().map(|c| &o.customer_id == c).unwrap_or(true))
            .filter(|o| query.laundromat_id.map(|l| o.laundromat_id == l).unwrap_or(true))
            .filter(|o| {
                query.status.as_ref().map(|s| s.is_empty() || s.contains(&o.status)).unwrap_or(true)
            })
            .filter(|o| query.since.map(|t| o.created_at >= t).unwrap_or(true))
            .filter(|o| query.until.map(|t| o.created_at <= t).unwrap_or(true))
            .cloned()
            .collect();
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| &o.order_id == order_id)
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        if order.status == new_status {
            return Err(PaymentGatewayError::OrderModificationNoOp);
        }
        let allowed = match (order.status.rank(), new_status.rank()) {
            (Some(_), None) => !order.status.is_terminal(),
            (Some(from), Some(to)) => to > from,
            _ => false,
        };
        if !allowed {
            return Err(PaymentGatewayError::OrderModificationForbidden);
        }
        order.status = new_status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn assign_driver(&self, order_id: &OrderId, driver_id: &str) -> Result<Order, PaymentGatewayError> {
        let mut inner = self.inner.lock().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| &o.order_id == order_id)
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        if order.status.is_terminal() {
            return Err(PaymentGatewayError::OrderModificationForbidden);
        }
        order.driver_id = Some(driver_id.to_string());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

impl LaundromatManagement for MemoryDatabase {
    async fn fetch_laundromat(&self, id: i64) -> Result<Option<Laundromat>, PaymentGatewayError> {
        let inner = self.inner.lock().await;
        Ok(inner.laundromats.iter().find(|l| l.id == id).cloned())
    }

    async fn fetch_active_laundromats(&self) -> Result<Vec<Laundromat>, PaymentGatewayError> {
        let inner = self.inner.lock().await;
        Ok(inner.laundromats.iter().filter(|l| l.active).cloned().collect())
    }

    async fn insert_laundromat(&self, laundromat: NewLaundromat) -> Result<Laundromat, PaymentGatewayError> {
        Ok(self.seed_laundromat(laundromat).await)
    }
}

//--------------------------------------     TestProvider      -------------------------------------------------------
/// A scriptable charge provider. Succeeds (with a deterministic ref) or rejects every charge, and records the
/// requests it saw.
#[derive(Clone, Default)]
pub struct TestProvider {
    pub reject: bool,
    pub calls: Arc<AtomicUsize>,
    pub last_request: Arc<Mutex<Option<ChargeRequest>>>,
}

impl TestProvider {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self { reject: true, ..Self::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChargeProvider for TestProvider {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeHandle, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some(request.clone());
        if self.reject {
            return Err(ProviderError::Rejected("card declined".to_string()));
        }
        Ok(ChargeHandle {
            provider_ref: format!("pi_test_{}", request.payment_id),
            client_secret: Some(format!("pi_test_{}_secret", request.payment_id)),
        })
    }
}

//--------------------------------------     Seed helpers      -------------------------------------------------------
pub fn new_shop(payout: Option<&str>) -> NewLaundromat {
    NewLaundromat {
        name: "Suds City".to_string(),
        address: "742 Evergreen Terrace".to_string(),
        latitude: 34.0522,
        longitude: -118.2437,
        delivery_radius: 10.0,
        payout_account: payout.map(String::from),
    }
}

pub fn save20(usage_limit: i64) -> NewPromoCode {
    let now = Utc::now();
    NewPromoCode {
        code: "SAVE20".to_string(),
        discount_percent: 20,
        max_discount: Cents::from(500),
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(30),
        usage_limit,
    }
}
