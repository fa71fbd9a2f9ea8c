//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions, which get executed
//! concurrently by worker threads and thus don't block execution.
use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use washpay_engine::{
    db_types::{NewLaundromat, NewPromoCode, OrderId},
    traits::{ChargeProvider, MarketplaceDatabase},
    NewOrderRequest,
    OrderFlowApi,
    OrderQueryFilter,
};

use crate::{
    data_objects::{
        AssignDriverRequest,
        NearestLaundromatQuery,
        NearestLaundromatResponse,
        PromoPreviewRequest,
        PromoPreviewResponse,
        UpdateStatusRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/orders" impl MarketplaceDatabase, ChargeProvider);
/// Route handler for the checkout endpoint.
///
/// Runs the full order flow: price the order, reserve the promo, persist the order and pending payment, and create
/// a charge with the provider. The response includes the full price breakdown and the client secret the customer's
/// app uses to confirm the charge.
pub async fn create_order<B, P>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let req = body.into_inner();
    debug!("💻️ POST create order for customer {} at laundromat {}", req.customer_id, req.laundromat_id);
    let result = api.create_order(req).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl MarketplaceDatabase, ChargeProvider);
pub async fn order_by_id<B, P>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id}");
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(payment_for_order => Get "/orders/{order_id}/payment" impl MarketplaceDatabase, ChargeProvider);
pub async fn payment_for_order<B, P>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET payment for order {order_id}");
    let payment = api
        .fetch_payment_for_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment for order {order_id}")))?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(orders_search => Get "/orders" impl MarketplaceDatabase, ChargeProvider);
pub async fn orders_search<B, P>(
    query: web::Query<OrderQueryFilter>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let filter = query.into_inner();
    debug!("💻️ GET orders search");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Fulfilment  ----------------------------------------------------
route!(update_order_status => Patch "/orders/{order_id}/status" impl MarketplaceDatabase, ChargeProvider);
/// Staff endpoint for moving an order through the washing pipeline. Transitions are strictly forward; cancelling
/// is possible from any state except `Delivered`.
pub async fn update_order_status<B, P>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let order_id = OrderId::from(path.into_inner());
    let new_status = body.into_inner().status;
    debug!("💻️ PATCH order {order_id} status to {new_status}");
    let order = api.modify_order_status(&order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(assign_driver => Patch "/orders/{order_id}/driver" impl MarketplaceDatabase, ChargeProvider);
pub async fn assign_driver<B, P>(
    path: web::Path<String>,
    body: web::Json<AssignDriverRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let order_id = OrderId::from(path.into_inner());
    let driver_id = body.into_inner().driver_id;
    debug!("💻️ PATCH order {order_id} driver to {driver_id}");
    let order = api.assign_driver(&order_id, &driver_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Promos  ----------------------------------------------------
route!(promo_preview => Post "/promos/preview" impl MarketplaceDatabase, ChargeProvider);
/// Quotes the discount a promo code would grant without consuming any of its allowance.
pub async fn promo_preview<B, P>(
    body: web::Json<PromoPreviewRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let req = body.into_inner();
    debug!("💻️ POST promo preview for {}", req.code);
    let response = match api.preview_promo(&req.code, req.base_price, Utc::now()).await {
        Ok(discount) => PromoPreviewResponse { valid: true, discount: Some(discount), message: None },
        Err(e) => {
            debug!("💻️ Promo {} did not validate: {e}", req.code);
            PromoPreviewResponse { valid: false, discount: None, message: Some(e.to_string()) }
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(create_promo => Post "/promos" impl MarketplaceDatabase, ChargeProvider);
pub async fn create_promo<B, P>(
    body: web::Json<NewPromoCode>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let promo = body.into_inner();
    debug!("💻️ POST create promo {}", promo.code);
    let promo = api.db().create_promo(promo).await.map_err(washpay_engine::OrderFlowError::Promo)?;
    Ok(HttpResponse::Ok().json(promo))
}

//----------------------------------------------   Laundromats  ----------------------------------------------------
route!(nearest_laundromat => Get "/laundromats/nearest" impl MarketplaceDatabase, ChargeProvider);
/// Finds the nearest active laundromat whose delivery radius covers the given point.
pub async fn nearest_laundromat<B, P>(
    query: web::Query<NearestLaundromatQuery>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let q = query.into_inner();
    debug!("💻️ GET nearest laundromat to ({}, {})", q.latitude, q.longitude);
    match api.nearest_laundromat(q.latitude, q.longitude).await? {
        Some((laundromat, distance_miles)) => {
            Ok(HttpResponse::Ok().json(NearestLaundromatResponse { laundromat, distance_miles }))
        },
        None => Err(ServerError::NoRecordFound("No laundromat can serve this location".to_string())),
    }
}

route!(create_laundromat => Post "/laundromats" impl MarketplaceDatabase, ChargeProvider);
pub async fn create_laundromat<B, P>(
    body: web::Json<NewLaundromat>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: ChargeProvider,
{
    let laundromat = body.into_inner();
    debug!("💻️ POST create laundromat {}", laundromat.name);
    let laundromat =
        api.db().insert_laundromat(laundromat).await.map_err(washpay_engine::OrderFlowError::Database)?;
    Ok(HttpResponse::Ok().json(laundromat))
}
