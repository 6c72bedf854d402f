use async_trait::async_trait;
use sqlx::{query, query_as, types::Json, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::{
    models::{
        customer::SqlxCustomer, Customer, CustomerUpdate, NewCustomer, Review,
    },
    Result,
};

#[async_trait]
pub trait CustomerRepository {
    async fn find_all(pool: &PgPool) -> Result<Vec<Customer>>;
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Customer>;
    async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Customer>>;
    async fn find_or_create(new_customer: &NewCustomer, pool: &PgPool) -> Result<Customer>;
    async fn create(new_customer: &NewCustomer, pool: &PgPool) -> Result<Customer>;
    async fn update(id: Uuid, update: &CustomerUpdate, pool: &PgPool) -> Result<Customer>;
    async fn delete(id: Uuid, pool: &PgPool) -> Result<()>;
    async fn add_review(id: Uuid, review: &Review, pool: &PgPool) -> Result<Customer>;
    async fn append_missing_orders(pool: &PgPool) -> Result<u64>;
}

pub struct CustomerDatabase;

#[async_trait]
impl CustomerRepository for CustomerDatabase {
    #[tracing::instrument(skip(pool), fields(repository = "customer"))]
    async fn find_all(pool: &PgPool) -> Result<Vec<Customer>> {
        let customers = query_as::<_, SqlxCustomer>(
            r#"
            SELECT * FROM customers ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(customers.into_iter().map(Customer::from).collect())
    }

    #[tracing::instrument(skip(pool), fields(repository = "customer"))]
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Customer> {
        let customer = query_as::<_, SqlxCustomer>(
            r#"
            SELECT * FROM customers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(customer.into())
    }

    #[tracing::instrument(skip(pool, email), fields(repository = "customer"))]
    async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Customer>> {
        let customer = query_as::<_, SqlxCustomer>(
            r#"
            SELECT * FROM customers WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(customer.map(Customer::from))
    }

    /// Concurrent callers racing on the same email all converge on the row
    /// the first insert produced.
    #[tracing::instrument(skip(pool, new_customer), fields(repository = "customer"))]
    async fn find_or_create(new_customer: &NewCustomer, pool: &PgPool) -> Result<Customer> {
        let inserted = query(
            r#"
            INSERT INTO customers
                (id, first_name, last_name, email, phone, street, city, state, zip_code, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_customer.first_name)
        .bind(&new_customer.last_name)
        .bind(&new_customer.email)
        .bind(&new_customer.phone)
        .bind(&new_customer.street)
        .bind(&new_customer.city)
        .bind(&new_customer.state)
        .bind(&new_customer.zip_code)
        .bind(&new_customer.country)
        .execute(pool)
        .await?
        .rows_affected();
        debug!(created = inserted > 0, "customer upserted");

        Self::find_by_email(&new_customer.email, pool)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    #[tracing::instrument(skip(pool, new_customer), fields(repository = "customer"))]
    async fn create(new_customer: &NewCustomer, pool: &PgPool) -> Result<Customer> {
        let customer = query_as::<_, SqlxCustomer>(
            r#"
            INSERT INTO customers
                (id, first_name, last_name, email, phone, street, city, state, zip_code, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_customer.first_name)
        .bind(&new_customer.last_name)
        .bind(&new_customer.email)
        .bind(&new_customer.phone)
        .bind(&new_customer.street)
        .bind(&new_customer.city)
        .bind(&new_customer.state)
        .bind(&new_customer.zip_code)
        .bind(&new_customer.country)
        .fetch_one(pool)
        .await?;
        Ok(customer.into())
    }

    #[tracing::instrument(skip(pool, update), fields(repository = "customer"))]
    async fn update(id: Uuid, update: &CustomerUpdate, pool: &PgPool) -> Result<Customer> {
        let customer = query_as::<_, SqlxCustomer>(
            r#"
            UPDATE customers SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                street = COALESCE($6, street),
                city = COALESCE($7, city),
                state = COALESCE($8, state),
                zip_code = COALESCE($9, zip_code),
                country = COALESCE($10, country),
                last_modified = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(&update.street)
        .bind(&update.city)
        .bind(&update.state)
        .bind(&update.zip_code)
        .bind(&update.country)
        .fetch_one(pool)
        .await?;
        Ok(customer.into())
    }

    #[tracing::instrument(skip(pool), fields(repository = "customer"))]
    async fn delete(id: Uuid, pool: &PgPool) -> Result<()> {
        let deleted = query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }
        Ok(())
    }

    #[tracing::instrument(skip(pool, review), fields(repository = "customer"))]
    async fn add_review(id: Uuid, review: &Review, pool: &PgPool) -> Result<Customer> {
        let customer = query_as::<_, SqlxCustomer>(
            r#"
            UPDATE customers
            SET reviews = reviews || $2::jsonb, last_modified = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(vec![review.clone()]))
        .fetch_one(pool)
        .await?;
        Ok(customer.into())
    }

    #[tracing::instrument(skip(pool), fields(repository = "customer"))]
    async fn append_missing_orders(pool: &PgPool) -> Result<u64> {
        let updated = query(
            r#"
            UPDATE customers c
            SET orders = c.orders || missing.ids, last_modified = now()
            FROM (
                SELECT o.customer_id, array_agg(o.id ORDER BY o.created_at) AS ids
                FROM orders o
                JOIN customers owner ON owner.id = o.customer_id
                WHERE NOT (o.id = ANY(owner.orders))
                GROUP BY o.customer_id
            ) missing
            WHERE c.id = missing.customer_id
            "#,
        )
        .execute(pool)
        .await?
        .rows_affected();
        Ok(updated)
    }
}
