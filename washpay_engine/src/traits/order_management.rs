use crate::{
    db_types::{Order, OrderId, OrderStatusType, Payment},
    traits::PaymentGatewayError,
    wpe_api::order_objects::OrderQueryFilter,
};

/// Order queries and the staff-facing fulfilment mutations.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, PaymentGatewayError>;

    /// Fetches orders matching the filter, ordered by creation time ascending.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Moves an order forward through the fulfilment pipeline.
    ///
    /// Statuses only move forward (`Pending -> PickedUp -> Washing -> OutForDelivery -> Delivered`);
    /// `Cancelled` is allowed from any state except `Delivered` and is terminal. Setting the current status again
    /// is a no-op error, and any backwards move is forbidden.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, PaymentGatewayError>;

    /// Assigns a driver to the order. Allowed while the order is in flight, i.e. not in a terminal state.
    async fn assign_driver(&self, order_id: &OrderId, driver_id: &str) -> Result<Order, PaymentGatewayError>;
}

/// Shared transition rule for [`OrderManagement::update_order_status`] implementations.
pub(crate) fn check_status_transition(
    old: OrderStatusType,
    new: OrderStatusType,
) -> Result<(), PaymentGatewayError> {
    if old == new {
        return Err(PaymentGatewayError::OrderModificationNoOp);
    }
    match (old.rank(), new.rank()) {
        // cancelling is allowed from any non-terminal state
        (Some(_), None) if !old.is_terminal() => Ok(()),
        (Some(from), Some(to)) if to > from => Ok(()),
        _ => Err(PaymentGatewayError::OrderModificationForbidden),
    }
}
