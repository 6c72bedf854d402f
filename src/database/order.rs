use async_trait::async_trait;
use sqlx::{query, query_as, types::Json, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::{
    models::{order::SqlxOrder, NewOrder, Order},
    Result,
};

#[async_trait]
pub trait OrderRepository {
    async fn find_all(pool: &PgPool) -> Result<Vec<Order>>;
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Order>;
    async fn find_by_customer(customer_id: Uuid, pool: &PgPool) -> Result<Vec<Order>>;
    /// Writes the order and appends it to its customer's list as one unit.
    /// `None` when an order for the same checkout session already exists.
    async fn insert_and_link(new_order: &NewOrder, pool: &PgPool) -> Result<Option<Order>>;
    async fn save(order: &Order, pool: &PgPool) -> Result<Order>;
}

pub struct OrderDatabase;

#[async_trait]
impl OrderRepository for OrderDatabase {
    #[tracing::instrument(skip(pool), fields(repository = "order"))]
    async fn find_all(pool: &PgPool) -> Result<Vec<Order>> {
        let orders = query_as::<_, SqlxOrder>(
            r#"
            SELECT * FROM orders ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(orders.into_iter().map(Order::from).collect())
    }

    #[tracing::instrument(skip(pool), fields(repository = "order"))]
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Order> {
        let order = query_as::<_, SqlxOrder>(
            r#"
            SELECT * FROM orders WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(order.into())
    }

    #[tracing::instrument(skip(pool), fields(repository = "order"))]
    async fn find_by_customer(customer_id: Uuid, pool: &PgPool) -> Result<Vec<Order>> {
        let orders = query_as::<_, SqlxOrder>(
            r#"
            SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at
            "#,
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        Ok(orders.into_iter().map(Order::from).collect())
    }

    /// Relies on the unique index over `session_id`, so two deliveries of the
    /// same event racing each other still produce exactly one row. A failed
    /// back-reference rolls the insert back, leaving the session unrecorded.
    #[tracing::instrument(skip(pool, new_order), fields(repository = "order", session_id = %new_order.session_id))]
    async fn insert_and_link(new_order: &NewOrder, pool: &PgPool) -> Result<Option<Order>> {
        let mut tx = pool.begin().await?;
        let order = query_as::<_, SqlxOrder>(
            r#"
            INSERT INTO orders
                (id, customer_id, items, shipping_method, shipping_cost,
                 total_amount, status, payment, session_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_order.customer_id)
        .bind(Json(&new_order.items))
        .bind(&new_order.shipping_method)
        .bind(new_order.shipping_cost)
        .bind(new_order.total_amount)
        .bind(new_order.status)
        .bind(new_order.payment)
        .bind(&new_order.session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let order = match order {
            Some(order) => Order::from(order),
            None => {
                debug!("session already recorded");
                return Ok(None);
            }
        };
        query(
            r#"
            UPDATE customers
            SET orders = array_append(orders, $2), last_modified = now()
            WHERE id = $1 AND NOT ($2 = ANY(orders))
            "#,
        )
        .bind(order.customer.id())
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(order))
    }

    #[tracing::instrument(skip(pool, order), fields(repository = "order", id = %order.id))]
    async fn save(order: &Order, pool: &PgPool) -> Result<Order> {
        let order = query_as::<_, SqlxOrder>(
            r#"
            UPDATE orders SET
                status = $2,
                tracking_number = $3,
                cancellation_reason = $4,
                total_amount = $5,
                last_modified = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(&order.tracking_number)
        .bind(&order.cancellation_reason)
        .bind(order.total_amount)
        .fetch_one(pool)
        .await?;
        Ok(order.into())
    }
}
