use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use wps_common::Cents;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The public identifier of an order. Minted server-side at checkout and used as the correlation key on provider
/// callbacks and promo reservations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        let n: u64 = rand::thread_rng().gen();
        Self(format!("ord_{n:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// Fulfilment status of an order. Moves strictly forward through the washing pipeline; `Cancelled` is terminal and
/// reachable from any state except `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created. Also the customer-facing "awaiting laundromat action" state after payment.
    Pending,
    /// A driver has collected the laundry from the customer.
    PickedUp,
    /// The laundromat is processing the order.
    Washing,
    /// The clean laundry is on its way back to the customer.
    OutForDelivery,
    /// The order is complete.
    Delivered,
    /// The order was cancelled by the customer, staff, or a failed payment. Terminal.
    Cancelled,
}

impl OrderStatusType {
    /// Position in the forward-only pipeline. `Cancelled` has no rank; it is handled separately.
    pub fn rank(&self) -> Option<u8> {
        match self {
            OrderStatusType::Pending => Some(0),
            OrderStatusType::PickedUp => Some(1),
            OrderStatusType::Washing => Some(2),
            OrderStatusType::OutForDelivery => Some(3),
            OrderStatusType::Delivered => Some(4),
            OrderStatusType::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::PickedUp => write!(f, "PickedUp"),
            OrderStatusType::Washing => write!(f, "Washing"),
            OrderStatusType::OutForDelivery => write!(f, "OutForDelivery"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "PickedUp" => Ok(Self::PickedUp),
            "Washing" => Ok(Self::Washing),
            "OutForDelivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// Lifecycle of a payment record. Created `Pending`; only the webhook reconciler moves it to a terminal state.
/// Re-applying the same terminal state is a no-op; `Completed` and `Failed` never convert into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub laundromat_id: i64,
    pub driver_id: Option<String>,
    pub status: OrderStatusType,
    pub pickup_address: String,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub scheduled_pickup_at: DateTime<Utc>,
    pub service_id: String,
    /// Snapshot of the service name at order time, so later catalogue edits don't rewrite history.
    pub service_name: String,
    pub notes: Option<String>,
    pub final_price: Cents,
    pub platform_fee: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub laundromat_id: i64,
    pub pickup_address: String,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub scheduled_pickup_at: DateTime<Utc>,
    pub service_id: String,
    pub service_name: String,
    pub notes: Option<String>,
    pub final_price: Cents,
    pub platform_fee: Cents,
}

//--------------------------------------       Payment         -------------------------------------------------------
/// One-to-one with an order. `amount` is the total the customer is charged (final price plus the platform fee on
/// top); `merchant_payout` is what the laundromat receives (final price minus the fee).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Cents,
    pub platform_fee: Cents,
    pub merchant_payout: Cents,
    pub discount: Cents,
    pub promo_code: Option<String>,
    /// The provider's charge reference. Null until the provider has responded to charge creation.
    pub provider_ref: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Cents,
    pub platform_fee: Cents,
    pub merchant_payout: Cents,
    pub discount: Cents,
    pub promo_code: Option<String>,
}

//--------------------------------------      PromoCode        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: i64,
    /// Stored uppercase; matched case-insensitively.
    pub code: String,
    pub discount_percent: u32,
    pub max_discount: Cents,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: i64,
    pub usage_count: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_percent: u32,
    pub max_discount: Cents,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: i64,
}

//--------------------------------------   PromoReservation    -------------------------------------------------------
/// One row per `(promo, order)` pair. The ledger row is what makes promo usage accounting idempotent: reserving
/// twice for the same order finds the row and does nothing, and releasing flips `released` exactly once.
#[derive(Debug, Clone, FromRow)]
pub struct PromoReservation {
    pub id: i64,
    pub promo_id: i64,
    pub order_id: OrderId,
    pub released: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Laundromat       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Laundromat {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// How far this laundromat will travel for pickup and delivery, in miles.
    pub delivery_radius: f64,
    /// External payout account reference. A laundromat cannot receive payments until this is set.
    pub payout_account: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewLaundromat {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub delivery_radius: f64,
    pub payout_account: Option<String>,
}
