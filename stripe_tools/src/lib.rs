//! A thin client for the Stripe REST API, covering the slice of it that the WashPay gateway uses:
//! creating destination charges (PaymentIntents with an application fee routed to the platform) and
//! deserializing the webhook event envelope that Stripe posts back.

mod api;
mod config;
pub mod data_objects;
mod error;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{NewPaymentIntent, PaymentIntent, WebhookEvent};
pub use error::StripeApiError;
