use actix_web::{http::StatusCode, web, web::ServiceConfig};
use washpay_engine::{
    db_types::PaymentStatus,
    events::EventProducers,
    traits::{ChargeHandle, PaymentGatewayError},
    OrderFlowApi,
};

use super::{
    helpers::{get_request, patch_request, post_request, sample_order, sample_payment, sample_shop},
    mocks::{MockMarketplace, MockProvider},
};
use crate::routes::{CreateOrderRoute, OrderByIdRoute, UpdateOrderStatusRoute};

fn checkout_body() -> String {
    r#"{
        "customer_id": "cust_100",
        "laundromat_id": 1,
        "service_id": "wash_fold",
        "service_name": "Wash & Fold",
        "base_price": 3000,
        "promo_code": "SAVE20",
        "pickup_address": "22 Acacia Ave",
        "pickup_latitude": 34.06,
        "pickup_longitude": -118.25,
        "scheduled_pickup_at": "2024-06-02T09:30:00Z"
    }"#
    .to_string()
}

fn checkout_api(db: MockMarketplace, provider: MockProvider) -> web::Data<OrderFlowApi<MockMarketplace, MockProvider>> {
    web::Data::new(OrderFlowApi::new(db, provider, EventProducers::default()))
}

#[actix_web::test]
async fn checkout_happy_path() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders", &checkout_body(), configure_happy).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""provider_ref":"pi_3PYYYY""#), "unexpected body: {body}");
    assert!(body.contains(r#""client_secret":"pi_3PYYYY_secret_abc""#), "unexpected body: {body}");
}

fn configure_happy(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_laundromat().returning(|id| Ok(Some(sample_shop(id, Some("acct_42")))));
    db.expect_validate_promo().returning(|code, _| Ok(super::helpers::sample_promo(code)));
    db.expect_create_order_with_payment().returning(|order, _| {
        let mut payment = sample_payment(order.order_id.as_str(), PaymentStatus::Pending);
        payment.provider_ref = None;
        Ok((sample_order(order.order_id.as_str()), payment))
    });
    db.expect_attach_provider_ref().returning(|_, provider_ref| {
        let mut payment = sample_payment("ord_1", PaymentStatus::Pending);
        payment.provider_ref = Some(provider_ref.to_string());
        Ok(payment)
    });
    let mut provider = MockProvider::new();
    provider.expect_create_charge().returning(|_| {
        Ok(ChargeHandle {
            provider_ref: "pi_3PYYYY".to_string(),
            client_secret: Some("pi_3PYYYY_secret_abc".to_string()),
        })
    });
    cfg.service(CreateOrderRoute::<MockMarketplace, MockProvider>::new()).app_data(checkout_api(db, provider));
}

#[actix_web::test]
async fn checkout_unknown_laundromat_is_404() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/orders", &checkout_body(), configure_unknown_shop).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("error"), "unexpected body: {body}");
}

fn configure_unknown_shop(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_laundromat().returning(|_| Ok(None));
    cfg.service(CreateOrderRoute::<MockMarketplace, MockProvider>::new())
        .app_data(checkout_api(db, MockProvider::new()));
}

#[actix_web::test]
async fn checkout_without_payout_account_is_422() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders", &checkout_body(), configure_no_payout).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("payout account"), "unexpected body: {body}");
}

fn configure_no_payout(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_laundromat().returning(|id| Ok(Some(sample_shop(id, None))));
    cfg.service(CreateOrderRoute::<MockMarketplace, MockProvider>::new())
        .app_data(checkout_api(db, MockProvider::new()));
}

#[actix_web::test]
async fn checkout_provider_rejection_is_502() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders", &checkout_body(), configure_rejecting).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("error"), "unexpected body: {body}");
}

fn configure_rejecting(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_laundromat().returning(|id| Ok(Some(sample_shop(id, Some("acct_42")))));
    db.expect_validate_promo().returning(|code, _| Ok(super::helpers::sample_promo(code)));
    db.expect_create_order_with_payment().returning(|order, _| {
        let mut payment = sample_payment(order.order_id.as_str(), PaymentStatus::Pending);
        payment.provider_ref = None;
        Ok((sample_order(order.order_id.as_str()), payment))
    });
    // the failed charge must abandon the payment
    db.expect_abandon_payment().times(1).returning(|_| Ok(sample_payment("ord_1", PaymentStatus::Failed)));
    let mut provider = MockProvider::new();
    provider.expect_create_charge().returning(|_| {
        Err(washpay_engine::traits::ProviderError::Rejected("Your card was declined".to_string()))
    });
    cfg.service(CreateOrderRoute::<MockMarketplace, MockProvider>::new()).app_data(checkout_api(db, provider));
}

#[actix_web::test]
async fn fetch_order_by_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/ord_1", configure_fetch).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""order_id":"ord_1""#), "unexpected body: {body}");

    let (status, _) = get_request("/orders/ord_unknown", configure_fetch_missing).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure_fetch(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_order_by_order_id().returning(|id| Ok(Some(sample_order(id.as_str()))));
    cfg.service(OrderByIdRoute::<MockMarketplace, MockProvider>::new())
        .app_data(checkout_api(db, MockProvider::new()));
}

fn configure_fetch_missing(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_order_by_order_id().returning(|_| Ok(None));
    cfg.service(OrderByIdRoute::<MockMarketplace, MockProvider>::new())
        .app_data(checkout_api(db, MockProvider::new()));
}

#[actix_web::test]
async fn illegal_status_change_is_409() {
    let _ = env_logger::try_init().ok();
    let (status, body) = patch_request("/orders/ord_1/status", r#"{"status": "Pending"}"#, configure_forbidden_status)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("forbidden"), "unexpected body: {body}");
}

fn configure_forbidden_status(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_update_order_status().returning(|_, _| Err(PaymentGatewayError::OrderModificationForbidden));
    cfg.service(UpdateOrderStatusRoute::<MockMarketplace, MockProvider>::new())
        .app_data(checkout_api(db, MockProvider::new()));
}
