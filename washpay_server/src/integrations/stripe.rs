//! The Stripe-backed charge provider.
use std::collections::HashMap;

use log::*;
use stripe_tools::{NewPaymentIntent, StripeApi, StripeApiError};
use washpay_engine::traits::{ChargeHandle, ChargeProvider, ChargeRequest, ProviderError};

/// Creates destination charges via Stripe payment intents. The order and payment ids travel in the intent's
/// metadata so webhook events can be correlated back to our records.
#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }
}

impl ChargeProvider for StripeGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeHandle, ProviderError> {
        let metadata = HashMap::from([
            ("order_id".to_string(), request.order_id.as_str().to_string()),
            ("payment_id".to_string(), request.payment_id.to_string()),
        ]);
        let new_intent = NewPaymentIntent {
            amount: request.amount,
            currency: request.currency.clone(),
            application_fee: request.application_fee,
            destination_account: request.destination_account.clone(),
            metadata,
            idempotency_key: request.idempotency_key.clone(),
        };
        let intent = self.api.create_payment_intent(&new_intent).await.map_err(|e| match e {
            StripeApiError::RestResponseError(m) => ProviderError::Unreachable(m),
            e => ProviderError::Rejected(e.to_string()),
        })?;
        // Stripe always issues a client secret on intent creation. Its absence means the intent is unusable.
        if intent.client_secret.is_none() {
            warn!("🪛️ Payment intent {} arrived without a client secret", intent.id);
            return Err(ProviderError::Rejected(StripeApiError::MissingClientSecret(intent.id).to_string()));
        }
        debug!("🪛️ Payment intent {} created for order [{}]", intent.id, request.order_id);
        Ok(ChargeHandle { provider_ref: intent.id, client_secret: intent.client_secret })
    }
}
