use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment};

/// A payment settled successfully: the order is paid for and the laundromat can start work.
///
/// Emitted exactly once per payment. The reconciler only fires this on an actual `Pending -> Completed` transition,
/// so duplicate webhook deliveries never produce duplicate events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub order: Order,
    pub payment: Payment,
}

impl PaymentConfirmedEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

/// A payment failed or was cancelled and the order was annulled as a result. Also emitted exactly once per payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}
