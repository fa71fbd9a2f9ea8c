//! Webhook signature middleware for Actix Web.
//!
//! The payment provider signs every webhook payload with a shared secret: the base64-encoded HMAC-SHA256 of the
//! raw request body, carried in the `x-webhook-signature` header. Wrapping the webhook scope with this middleware
//! rejects any request whose signature does not verify, before the payload reaches a handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use wps_common::Secret;

use crate::helpers::calculate_signature;

pub struct SignatureMiddlewareFactory {
    signature_header: String,
    key: Secret<String>,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(signature_header: &str, key: Secret<String>, enabled: bool) -> Self {
        SignatureMiddlewareFactory { signature_header: signature_header.into(), key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            signature_header: self.signature_header.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    signature_header: String,
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let signature_header = self.signature_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking signature for request");
            if !enabled {
                trace!("🔐️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let expected = calculate_signature(&secret, data.as_ref());
            let signature = req.headers().get(&signature_header).ok_or_else(|| {
                warn!("🔐️ No signature found in request. Denying access.");
                ErrorForbidden("No signature found.")
            })?;
            let validated = signature == expected.as_str();
            if validated {
                trace!("🔐️ Signature check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid signature found in request. Denying access.");
                Err(ErrorForbidden("Invalid signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
