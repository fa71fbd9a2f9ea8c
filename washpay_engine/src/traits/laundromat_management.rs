use crate::{
    db_types::{Laundromat, NewLaundromat},
    traits::PaymentGatewayError,
};

/// Laundromat lookups for checkout and nearest-shop matching.
#[allow(async_fn_in_trait)]
pub trait LaundromatManagement {
    async fn fetch_laundromat(&self, id: i64) -> Result<Option<Laundromat>, PaymentGatewayError>;

    /// All laundromats currently accepting orders. The nearest-shop search runs over this set.
    async fn fetch_active_laundromats(&self) -> Result<Vec<Laundromat>, PaymentGatewayError>;

    async fn insert_laundromat(&self, laundromat: NewLaundromat) -> Result<Laundromat, PaymentGatewayError>;
}
