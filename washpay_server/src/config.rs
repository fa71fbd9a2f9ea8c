use std::{env, net::IpAddr};

use log::*;
use stripe_tools::StripeConfig;
use wps_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_WPG_HOST: &str = "127.0.0.1";
const DEFAULT_WPG_PORT: u16 = 8360;

/// The header the payment provider puts its payload signature in.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Webhook endpoint protection (signature verification and optional IP whitelist).
    pub webhook_config: WebhookConfig,
    /// Payment provider credentials.
    pub stripe_config: StripeConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// Shared secret used to verify the provider's payload signatures.
    pub secret: Secret<String>,
    pub signature_checks: bool,
    /// If supplied, requests against /webhook endpoints will be checked against a whitelist of provider IP
    /// addresses. To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WPG_HOST.to_string(),
            port: DEFAULT_WPG_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_config: WebhookConfig::default(),
            stripe_config: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("WPG_HOST").ok().unwrap_or_else(|| DEFAULT_WPG_HOST.into());
        let port = env::var("WPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for WPG_PORT. {e} Using the default, {DEFAULT_WPG_PORT}, instead."
                    );
                    DEFAULT_WPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_WPG_PORT);
        let database_url = env::var("WPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ WPG_DATABASE_URL is not set. Please set it to the URL for the WashPay database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("WPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("WPG_USE_FORWARDED").ok(), false);
        let webhook_config = WebhookConfig::from_env_or_defaults();
        let stripe_config = StripeConfig::new_from_env_or_default();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, webhook_config, stripe_config }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret = env::var("WPG_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ WPG_WEBHOOK_SECRET is not set. Please set it to the signing key for your webhook endpoint.");
            String::default()
        });
        let secret = Secret::new(secret);
        let signature_checks = parse_boolean_flag(env::var("WPG_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        let whitelist = env::var("WPG_WEBHOOK_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ Webhook IP whitelist is disabled. If this is not what you want, set \
                     WPG_WEBHOOK_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.parse()
                        .map_err(|e| {
                            warn!("🪛️ Ignoring invalid IP address ({s}) in WPG_WEBHOOK_IP_WHITELIST: {e}");
                            None::<IpAddr>
                        })
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming provider requests."
                );
            },
            None => {
                info!("🪛️ No webhook IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Webhook IP whitelist: {addrs}");
            },
        }
        Self { secret, signature_checks, whitelist }
    }
}
