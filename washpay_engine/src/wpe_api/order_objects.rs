use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wps_common::Cents;

use crate::{
    db_types::{Order, OrderStatusType, Payment},
    pricing::PriceBreakdown,
};

/// What a customer submits at checkout. The money fields are limited to the advertised service price; every derived
/// amount (discount, fee, total) is computed server-side and never trusted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewOrderRequest {
    pub customer_id: String,
    pub laundromat_id: i64,
    pub service_id: String,
    pub service_name: String,
    pub base_price: Cents,
    #[serde(default)]
    pub promo_code: Option<String>,
    pub pickup_address: String,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub scheduled_pickup_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Everything the client needs after a successful checkout: the persisted records, the full money picture, and the
/// provider's client secret for confirming the charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub payment: Payment,
    pub breakdown: PriceBreakdown,
    pub client_secret: Option<String>,
}

/// What a provider event did to our records. `AlreadyApplied` means the event was a duplicate (or lost a race to a
/// concurrent copy of itself) and no side effects were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    Applied,
    AlreadyApplied,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub laundromat_id: Option<i64>,
    pub status: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.laundromat_id.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self.since.is_none()
            && self.until.is_none()
    }

    pub fn customer_id(mut self, id: String) -> Self {
        self.customer_id = Some(id);
        self
    }

    pub fn laundromat_id(mut self, id: i64) -> Self {
        self.laundromat_id = Some(id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }
}
