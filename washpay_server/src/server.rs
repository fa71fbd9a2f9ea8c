use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    error::ErrorForbidden,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::{info, warn};
use stripe_tools::StripeApi;
use washpay_engine::{events::EventHandlers, OrderFlowApi, SqliteDatabase};

use crate::{
    config::{ServerConfig, WEBHOOK_SIGNATURE_HEADER},
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{notification_hooks, StripeGateway},
    middleware::SignatureMiddlewareFactory,
    routes::{
        health,
        AssignDriverRoute,
        CreateLaundromatRoute,
        CreateOrderRoute,
        CreatePromoRoute,
        NearestLaundromatRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        PaymentForOrderRoute,
        PromoPreviewRoute,
        UpdateOrderStatusRoute,
    },
    webhook_routes::PaymentWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let api = StripeApi::new(config.stripe_config.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let provider = StripeGateway::new(api);
    let handlers = EventHandlers::new(100, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, provider, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: StripeGateway,
    producers: washpay_engine::events::EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let order_api = OrderFlowApi::new(db.clone(), provider.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("wps::access_log"))
            .app_data(web::Data::new(order_api));
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase, StripeGateway>::new())
            .service(OrderByIdRoute::<SqliteDatabase, StripeGateway>::new())
            .service(PaymentForOrderRoute::<SqliteDatabase, StripeGateway>::new())
            .service(OrdersSearchRoute::<SqliteDatabase, StripeGateway>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase, StripeGateway>::new())
            .service(AssignDriverRoute::<SqliteDatabase, StripeGateway>::new())
            .service(PromoPreviewRoute::<SqliteDatabase, StripeGateway>::new())
            .service(CreatePromoRoute::<SqliteDatabase, StripeGateway>::new())
            .service(NearestLaundromatRoute::<SqliteDatabase, StripeGateway>::new())
            .service(CreateLaundromatRoute::<SqliteDatabase, StripeGateway>::new());
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook_config.whitelist.clone();
        let signature_check = SignatureMiddlewareFactory::new(
            WEBHOOK_SIGNATURE_HEADER,
            config.webhook_config.secret.clone(),
            config.webhook_config.signature_checks,
        );
        let webhook_scope = web::scope("/webhook")
            .wrap(signature_check)
            .wrap_fn(move |req, srv| {
                // Collect the peer IP from x-forwarded-for or forwarded headers _if_ `use_nnn` has been set to true
                // in the configuration. Otherwise, use the peer address from the connection info.
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                let whitelisted = match (peer_ip, &whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("Webhook delivery from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("No IP address found in the webhook peer request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(ErrorForbidden("Peer address is not whitelisted."))).boxed_local()
                }
            })
            .service(PaymentWebhookRoute::<SqliteDatabase, StripeGateway>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
