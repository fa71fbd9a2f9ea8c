use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::PaymentGatewayError,
    wpe_api::order_objects::OrderQueryFilter,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// Order ids are minted server-side, so an existing row with the same `order_id` means a retried insert; it is
/// reported as [`PaymentGatewayError::OrderAlreadyExists`] rather than silently replaced.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    if fetch_order_by_order_id(&order.order_id, conn).await?.is_some() {
        return Err(PaymentGatewayError::OrderAlreadyExists(order.order_id));
    }
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                laundromat_id,
                pickup_address,
                pickup_latitude,
                pickup_longitude,
                scheduled_pickup_at,
                service_id,
                service_name,
                notes,
                final_price,
                platform_fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.customer_id)
    .bind(order.laundromat_id)
    .bind(order.pickup_address)
    .bind(order.pickup_latitude)
    .bind(order.pickup_longitude)
    .bind(order.scheduled_pickup_at)
    .bind(order.service_id)
    .bind(order.service_name)
    .bind(order.notes)
    .bind(order.final_price)
    .bind(order.platform_fee)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(lid) = query.laundromat_id {
        where_clause.push("laundromat_id = ");
        where_clause.push_bind_unseparated(lid);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        query.status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

pub(crate) async fn update_order_status(
    order_id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentGatewayError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))
}

pub(crate) async fn set_driver(
    order_id: &OrderId,
    driver_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentGatewayError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET driver_id = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(driver_id)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))
}
