use chrono::{DateTime, Utc};
use mockall::mock;
use washpay_engine::{
    db_types::{
        Laundromat,
        NewLaundromat,
        NewOrder,
        NewPayment,
        NewPromoCode,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        PromoCode,
        PromoReservation,
    },
    traits::{
        ChargeHandle,
        ChargeProvider,
        ChargeRequest,
        LaundromatManagement,
        OrderManagement,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        PaymentSettled,
        PromoApiError,
        PromoLedger,
        ProviderError,
        ReleaseOutcome,
    },
    OrderQueryFilter,
};

mock! {
    pub Marketplace {}
    impl PaymentGatewayDatabase for Marketplace {
        fn url(&self) -> &str;
        async fn create_order_with_payment(&self, order: NewOrder, payment: NewPayment) -> Result<(Order, Payment), PaymentGatewayError>;
        async fn attach_provider_ref(&self, payment_id: i64, provider_ref: &str) -> Result<Payment, PaymentGatewayError>;
        async fn abandon_payment(&self, payment_id: i64) -> Result<Payment, PaymentGatewayError>;
        async fn complete_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError>;
        async fn fail_payment(&self, payment_id: i64) -> Result<Option<PaymentSettled>, PaymentGatewayError>;
        async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError>;
    }
    impl PromoLedger for Marketplace {
        async fn validate_promo(&self, code: &str, now: DateTime<Utc>) -> Result<PromoCode, PromoApiError>;
        async fn reserve_promo(&self, code: &str, order_id: &OrderId) -> Result<PromoReservation, PromoApiError>;
        async fn release_promo(&self, order_id: &OrderId) -> Result<ReleaseOutcome, PromoApiError>;
        async fn fetch_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>, PromoApiError>;
        async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, PromoApiError>;
    }
    impl OrderManagement for Marketplace {
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, PaymentGatewayError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError>;
        async fn update_order_status(&self, order_id: &OrderId, new_status: OrderStatusType) -> Result<Order, PaymentGatewayError>;
        async fn assign_driver(&self, order_id: &OrderId, driver_id: &str) -> Result<Order, PaymentGatewayError>;
    }
    impl LaundromatManagement for Marketplace {
        async fn fetch_laundromat(&self, id: i64) -> Result<Option<Laundromat>, PaymentGatewayError>;
        async fn fetch_active_laundromats(&self) -> Result<Vec<Laundromat>, PaymentGatewayError>;
        async fn insert_laundromat(&self, laundromat: NewLaundromat) -> Result<Laundromat, PaymentGatewayError>;
    }
}

mock! {
    pub Provider {}
    impl ChargeProvider for Provider {
        async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeHandle, ProviderError>;
    }
}
