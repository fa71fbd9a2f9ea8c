//! Customer notification hooks.
//!
//! Notifications are fired from the settlement events, which the engine emits exactly once per payment, so duplicate
//! webhook deliveries never produce duplicate messages. Delivery is currently a structured log line; a push or email
//! gateway slots in here without touching the reconciler.
use log::*;
use washpay_engine::events::EventHooks;

pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_payment_confirmed(|event| {
        Box::pin(async move {
            let order = &event.order;
            info!(
                "📬️ [notify:{}] Your payment of {} for order [{}] was received. {} will pick up your laundry at {}.",
                order.customer_id,
                event.payment.amount,
                order.order_id,
                order.service_name,
                order.scheduled_pickup_at
            );
        })
    });
    hooks.on_order_annulled(|event| {
        Box::pin(async move {
            let order = &event.order;
            info!(
                "📬️ [notify:{}] Your payment for order [{}] did not go through and the order was cancelled. \
                 You have not been charged.",
                order.customer_id, order.order_id
            );
        })
    });
    hooks
}
