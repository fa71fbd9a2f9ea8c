//! Webhook handlers for payment provider callbacks.
//!
//! The signature middleware has already authenticated the payload by the time these handlers run. Handlers always
//! respond in the 200 range: the provider retries non-2xx deliveries aggressively, and the reconciler is idempotent,
//! so a payload we cannot act on is logged and acknowledged rather than bounced.
use actix_web::{web, HttpResponse};
use log::*;
use stripe_tools::data_objects::WebhookEvent;
use washpay_engine::{
    db_types::OrderId,
    traits::{ChargeProvider, MarketplaceDatabase, ProviderEvent, ProviderEventKind},
    OrderFlowApi,
    ReconcileOutcome,
};

use crate::{data_objects::JsonResponse, route};

route!(payment_webhook => Post "/payments" impl MarketplaceDatabase, ChargeProvider);
pub async fn payment_webhook<B, P>(
    body: web::Json<WebhookEvent>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> HttpResponse
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let event = body.into_inner();
    info!("🔔️ Webhook delivery {} received: {}", event.id, event.event_type);
    let kind = match event.event_type.as_str() {
        "payment_intent.succeeded" => ProviderEventKind::ChargeSucceeded,
        "payment_intent.payment_failed" => ProviderEventKind::ChargeFailed,
        "payment_intent.canceled" => ProviderEventKind::ChargeCanceled,
        other => {
            debug!("🔔️ Ignoring webhook event type {other}");
            return HttpResponse::Ok().json(JsonResponse::success(format!("Ignoring event type {other}")));
        },
    };
    let Some(order_id) = event.metadata("order_id").map(|s| OrderId::from(s.to_string())) else {
        warn!("🔔️ Webhook delivery {} has no order_id metadata. Not one of ours?", event.id);
        return HttpResponse::Ok().json(JsonResponse::failure("Missing order_id metadata"));
    };
    let Some(payment_id) = event.metadata("payment_id").and_then(|s| s.parse::<i64>().ok()) else {
        warn!("🔔️ Webhook delivery {} has no usable payment_id metadata", event.id);
        return HttpResponse::Ok().json(JsonResponse::failure("Missing payment_id metadata"));
    };
    let provider_event = ProviderEvent {
        kind,
        order_id: order_id.clone(),
        payment_id,
        provider_ref: event.provider_ref().to_string(),
    };
    match api.handle_provider_event(provider_event).await {
        Ok(ReconcileOutcome::Applied) => {
            info!("🔔️ {:?} applied to payment {payment_id} (order [{order_id}])", kind);
            HttpResponse::Ok().json(JsonResponse::success("Event applied"))
        },
        Ok(ReconcileOutcome::AlreadyApplied) => {
            info!("🔔️ Duplicate delivery for payment {payment_id} (order [{order_id}]). Nothing to do.");
            HttpResponse::Ok().json(JsonResponse::success("Event already applied"))
        },
        Err(e) => {
            warn!("🔔️ Could not reconcile delivery {} for payment {payment_id}: {e}", event.id);
            HttpResponse::Ok().json(JsonResponse::failure(format!("Could not reconcile event: {e}")))
        },
    }
}
