use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wps_common::Cents;

/// Parameters for a destination charge: the customer is charged `amount`, the platform keeps
/// `application_fee`, and Stripe transfers the remainder to the merchant's connected account.
#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub amount: Cents,
    pub currency: String,
    pub application_fee: Cents,
    pub destination_account: String,
    /// Correlation metadata echoed back verbatim on webhook events.
    pub metadata: HashMap<String, String>,
    /// Key for Stripe's idempotency layer, so a retried create call cannot double-charge.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// The `data.object` of the webhook events we consume is always a PaymentIntent-shaped object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

/// The envelope Stripe posts to the webhook endpoint. Only the fields the reconciler needs are
/// deserialized; everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

impl WebhookEvent {
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.data.object.metadata.get(key).map(String::as_str)
    }

    pub fn provider_ref(&self) -> &str {
        &self.data.object.id
    }
}
