use actix_web::{http::StatusCode, web, web::ServiceConfig};
use washpay_engine::{events::EventProducers, traits::PromoApiError, OrderFlowApi};

use super::{
    helpers::{get_request, post_request, sample_promo, sample_shop},
    mocks::{MockMarketplace, MockProvider},
};
use crate::routes::{NearestLaundromatRoute, PromoPreviewRoute};

fn api(db: MockMarketplace) -> web::Data<OrderFlowApi<MockMarketplace, MockProvider>> {
    web::Data::new(OrderFlowApi::new(db, MockProvider::new(), EventProducers::default()))
}

#[actix_web::test]
async fn preview_quotes_a_live_code() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"code": "SAVE20", "base_price": 3000}"#;
    let (status, body) = post_request("/promos/preview", body, configure_live).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    // 20% of $30.00 is $6.00, capped to the $5.00 max discount
    assert_eq!(body, r#"{"valid":true,"discount":500,"message":null}"#);
}

fn configure_live(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_validate_promo().returning(|code, _| Ok(sample_promo(code)));
    cfg.service(PromoPreviewRoute::<MockMarketplace, MockProvider>::new()).app_data(api(db));
}

#[actix_web::test]
async fn preview_reports_unusable_codes_in_band() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"code": "STALE", "base_price": 3000}"#;
    let (status, body) = post_request("/promos/preview", body, configure_expired).await.expect("Request failed");
    // an unusable code is not an HTTP error
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"valid":false,"discount":null,"message":"This promo code has expired"}"#);
}

fn configure_expired(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_validate_promo().returning(|_, _| Err(PromoApiError::Expired));
    cfg.service(PromoPreviewRoute::<MockMarketplace, MockProvider>::new()).app_data(api(db));
}

#[actix_web::test]
async fn nearest_laundromat_lookup() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/laundromats/nearest?latitude=34.06&longitude=-118.25", configure_shops)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""name":"Sudsy Corner""#), "unexpected body: {body}");
    assert!(body.contains("distance_miles"), "unexpected body: {body}");
}

#[actix_web::test]
async fn nearest_laundromat_out_of_range_is_404() {
    let _ = env_logger::try_init().ok();
    // Nowhere near any shop's delivery radius
    let (status, _) = get_request("/laundromats/nearest?latitude=51.5&longitude=-0.12", configure_shops)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure_shops(cfg: &mut ServiceConfig) {
    let mut db = MockMarketplace::new();
    db.expect_fetch_active_laundromats().returning(|| Ok(vec![sample_shop(1, Some("acct_42"))]));
    cfg.service(NearestLaundromatRoute::<MockMarketplace, MockProvider>::new()).app_data(api(db));
}
