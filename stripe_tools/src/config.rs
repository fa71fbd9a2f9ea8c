use log::*;
use wps_common::Secret;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2024-06-20";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    /// Base URL for the Stripe API. Overridable so tests can point at a local stub.
    pub api_base: String,
    pub api_version: String,
    pub secret_key: Secret<String>,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("WPG_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_version = std::env::var("WPG_STRIPE_API_VERSION").unwrap_or_else(|_| {
            warn!("WPG_STRIPE_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let secret_key = Secret::new(std::env::var("WPG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("WPG_STRIPE_SECRET_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        Self { api_base, api_version, secret_key }
    }
}
