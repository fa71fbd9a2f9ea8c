use std::fmt::Display;

use serde::{Deserialize, Serialize};
use washpay_engine::db_types::{Cents, OrderStatusType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromoPreviewRequest {
    pub code: String,
    pub base_price: Cents,
}

/// Preview responses are always 200; an unusable code is reported in the body rather than as an HTTP error, so
/// storefronts can show the reason inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoPreviewResponse {
    pub valid: bool,
    pub discount: Option<Cents>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestLaundromatQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestLaundromatResponse {
    pub laundromat: washpay_engine::db_types::Laundromat,
    pub distance_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignDriverRequest {
    pub driver_id: String,
}
