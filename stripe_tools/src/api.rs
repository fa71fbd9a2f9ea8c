use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{NewPaymentIntent, PaymentIntent},
    StripeApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let version =
            HeaderValue::from_str(&config.api_version).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Stripe-Version", version);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending POST to {url}");
        let mut req = self.client.request(Method::POST, url).form(form);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    /// Create a destination charge. The customer pays `amount`; `application_fee` stays with the
    /// platform and the rest is routed to `destination_account`.
    ///
    /// The call carries an idempotency key, so retrying after an ambiguous network failure returns
    /// the original intent rather than creating a second charge.
    pub async fn create_payment_intent(&self, new_intent: &NewPaymentIntent) -> Result<PaymentIntent, StripeApiError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), new_intent.amount.value().to_string()),
            ("currency".into(), new_intent.currency.clone()),
            ("application_fee_amount".into(), new_intent.application_fee.value().to_string()),
            ("transfer_data[destination]".into(), new_intent.destination_account.clone()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        for (k, v) in &new_intent.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }
        debug!(
            "Creating payment intent for {} ({} fee) to {}",
            new_intent.amount, new_intent.application_fee, new_intent.destination_account
        );
        let intent: PaymentIntent =
            self.post_form("/payment_intents", &form, Some(new_intent.idempotency_key.as_str())).await?;
        info!("Created payment intent {} ({})", intent.id, intent.status);
        Ok(intent)
    }
}
