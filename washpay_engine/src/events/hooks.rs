use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderAnnulledEvent, PaymentConfirmedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_confirmed_producer: Vec<EventProducer<PaymentConfirmedEvent>>,
    pub order_annulled_producer: Vec<EventProducer<OrderAnnulledEvent>>,
}

pub struct EventHandlers {
    pub on_payment_confirmed: Option<EventHandler<PaymentConfirmedEvent>>,
    pub on_order_annulled: Option<EventHandler<OrderAnnulledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_confirmed = hooks.on_payment_confirmed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_annulled = hooks.on_order_annulled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_confirmed, on_order_annulled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_confirmed {
            result.payment_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_annulled {
            result.order_annulled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_annulled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_confirmed: Option<Handler<PaymentConfirmedEvent>>,
    pub on_order_annulled: Option<Handler<OrderAnnulledEvent>>,
}

impl EventHooks {
    pub fn on_payment_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_order_annulled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAnnulledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_annulled = Some(Arc::new(f));
        self
    }
}
