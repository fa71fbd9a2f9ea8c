//! The order flow API is the primary interface for the checkout and reconciliation flows of the marketplace.
//!
//! [`OrderFlowApi`] ties the storage backend, the external charge provider and the event hooks together. The server
//! exposes thin HTTP handlers over these methods; all business rules live here or below.
use chrono::{DateTime, Utc};
use log::*;
use wps_common::{Cents, USD_CURRENCY_CODE};

use crate::{
    db_types::{Laundromat, NewOrder, NewPayment, Order, OrderId, OrderStatusType, Payment},
    events::{EventProducers, OrderAnnulledEvent, PaymentConfirmedEvent},
    pricing::{discount_amount, nearest_laundromat, PriceBreakdown},
    traits::{
        ChargeProvider,
        ChargeRequest,
        MarketplaceDatabase,
        PromoApiError,
        ProviderEvent,
        ProviderEventKind,
    },
    wpe_api::{
        errors::OrderFlowError,
        order_objects::{CheckoutResult, NewOrderRequest, OrderQueryFilter, ReconcileOutcome},
    },
};

pub struct OrderFlowApi<B, P> {
    db: B,
    provider: P,
    producers: EventProducers,
}

impl<B, P> OrderFlowApi<B, P>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        Self { db, provider, producers }
    }

    /// Checks a promo code and quotes the discount it would grant on `base_price`, without consuming anything.
    pub async fn preview_promo(
        &self,
        code: &str,
        base_price: Cents,
        now: DateTime<Utc>,
    ) -> Result<Cents, PromoApiError> {
        let promo = self.db.validate_promo(code, now).await?;
        Ok(discount_amount(base_price, promo.discount_percent, promo.max_discount))
    }

    /// Finds the nearest active laundromat that will deliver to the given point, with the distance in miles.
    pub async fn nearest_laundromat(&self, lat: f64, lon: f64) -> Result<Option<(Laundromat, f64)>, OrderFlowError> {
        let shops = self.db.fetch_active_laundromats().await?;
        Ok(nearest_laundromat(lat, lon, &shops).map(|(shop, distance)| (shop.clone(), distance)))
    }

    /// Runs the full checkout flow for a new order.
    ///
    /// In order:
    /// * The laundromat is fetched and must be active and have a payout account.
    /// * The promo code (if any) is validated and the discount computed; the full price breakdown is assembled.
    /// * The order and its pending payment are persisted atomically, reserving the promo in the same transaction.
    /// * A charge is created with the provider, keyed on the payment id so retries cannot double-charge.
    ///
    /// If the provider rejects or cannot be reached, the payment is marked failed and the promo reservation
    /// released before the error is returned; the order row remains for audit.
    pub async fn create_order(&self, req: NewOrderRequest) -> Result<CheckoutResult, OrderFlowError> {
        let shop = self
            .db
            .fetch_laundromat(req.laundromat_id)
            .await?
            .filter(|s| s.active)
            .ok_or(OrderFlowError::LaundromatNotFound(req.laundromat_id))?;
        let destination_account =
            shop.payout_account.clone().ok_or(OrderFlowError::PayoutAccountMissing(shop.id))?;
        let discount = match &req.promo_code {
            Some(code) => self.preview_promo(code, req.base_price, Utc::now()).await?,
            None => Cents::ZERO,
        };
        let breakdown = PriceBreakdown::quote(req.base_price, discount);
        let order_id = OrderId::random();
        let order = NewOrder {
            order_id: order_id.clone(),
            customer_id: req.customer_id,
            laundromat_id: shop.id,
            pickup_address: req.pickup_address,
            pickup_latitude: req.pickup_latitude,
            pickup_longitude: req.pickup_longitude,
            scheduled_pickup_at: req.scheduled_pickup_at,
            service_id: req.service_id,
            service_name: req.service_name,
            notes: req.notes,
            final_price: breakdown.final_price,
            platform_fee: breakdown.platform_fee,
        };
        let payment = NewPayment {
            order_id: order_id.clone(),
            amount: breakdown.total_charge,
            platform_fee: breakdown.platform_fee,
            merchant_payout: breakdown.merchant_payout,
            discount: breakdown.discount,
            promo_code: req.promo_code.map(|c| c.to_uppercase()),
        };
        let (order, payment) = self.db.create_order_with_payment(order, payment).await?;
        info!("🛒️ Order [{order_id}] created for {}. Initiating charge of {}.", order.customer_id, payment.amount);
        let charge = ChargeRequest {
            amount: payment.amount,
            currency: USD_CURRENCY_CODE.to_string(),
            // the provider withholds this from the transfer, so the merchant receives exactly merchant_payout
            application_fee: payment.amount - payment.merchant_payout,
            destination_account,
            order_id: order_id.clone(),
            payment_id: payment.id,
            // same payment, same key, so an ambiguous timeout can be retried without double-charging
            idempotency_key: format!("payment-{}", payment.id),
        };
        match self.provider.create_charge(&charge).await {
            Ok(handle) => {
                let payment = self.db.attach_provider_ref(payment.id, &handle.provider_ref).await?;
                info!("🛒️ Charge {} created for order [{order_id}]", handle.provider_ref);
                Ok(CheckoutResult { order, payment, breakdown, client_secret: handle.client_secret })
            },
            Err(e) => {
                warn!("🛒️ Charge initiation failed for order [{order_id}]: {e}");
                self.db.abandon_payment(payment.id).await?;
                Err(OrderFlowError::PaymentInitiationFailed(e.to_string()))
            },
        }
    }

    /// Applies a provider event to our records. Safe to call any number of times with the same event.
    ///
    /// Only an actual settlement transition emits a notification event; duplicates report
    /// [`ReconcileOutcome::AlreadyApplied`] and emit nothing.
    pub async fn handle_provider_event(&self, event: ProviderEvent) -> Result<ReconcileOutcome, OrderFlowError> {
        debug!("🔁️ Reconciling {:?} for payment {} (order [{}])", event.kind, event.payment_id, event.order_id);
        match event.kind {
            ProviderEventKind::ChargeSucceeded => match self.db.complete_payment(event.payment_id).await? {
                Some(settled) => {
                    self.call_payment_confirmed_hook(&settled.order, &settled.payment).await;
                    Ok(ReconcileOutcome::Applied)
                },
                None => Ok(ReconcileOutcome::AlreadyApplied),
            },
            ProviderEventKind::ChargeFailed | ProviderEventKind::ChargeCanceled => {
                match self.db.fail_payment(event.payment_id).await? {
                    Some(settled) => {
                        self.call_order_annulled_hook(&settled.order, &settled.payment).await;
                        Ok(ReconcileOutcome::Applied)
                    },
                    None => Ok(ReconcileOutcome::AlreadyApplied),
                }
            },
        }
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let order = self.db.fetch_order_by_order_id(order_id).await?;
        Ok(order)
    }

    pub async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderFlowError> {
        let payment = self.db.fetch_payment_for_order(order_id).await?;
        Ok(payment)
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.search_orders(query).await?;
        Ok(orders)
    }

    /// Staff-facing fulfilment transition. The monotonic transition rules are enforced by the backend.
    pub async fn modify_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.update_order_status(order_id, new_status).await?;
        Ok(order)
    }

    pub async fn assign_driver(&self, order_id: &OrderId, driver_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.db.assign_driver(order_id, driver_id).await?;
        Ok(order)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    async fn call_payment_confirmed_hook(&self, order: &Order, payment: &Payment) {
        for emitter in &self.producers.payment_confirmed_producer {
            let event = PaymentConfirmedEvent::new(order.clone(), payment.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order, payment: &Payment) {
        for emitter in &self.producers.order_annulled_producer {
            let event = OrderAnnulledEvent::new(order.clone(), payment.clone());
            emitter.publish_event(event).await;
        }
    }
}
