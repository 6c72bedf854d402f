use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    database::{CustomerDatabase, OrderDatabase},
    models::{Customer, CustomerUpdate, NewCustomer, NewReview, Order},
    routes::ExpandQuery,
    Result,
};

#[tracing::instrument(name = "list_customers", skip(pool, _admin))]
pub async fn list_customers(pool: web::Data<PgPool>, _admin: AdminUser) -> Result<HttpResponse> {
    let customers = Customer::find_all::<CustomerDatabase>(&pool).await?;
    Ok(HttpResponse::Ok().json(customers))
}

/// With `?expand=orders` the order ids are replaced by the orders themselves
#[tracing::instrument(name = "customer_by_id", skip(pool, _admin))]
pub async fn customer_by_id(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
    query: web::Query<ExpandQuery>,
) -> Result<HttpResponse> {
    let customer = Customer::find_by_id::<CustomerDatabase>(id.into_inner(), &pool).await?;
    if !query.includes("orders") {
        return Ok(HttpResponse::Ok().json(customer));
    }
    let orders = Order::find_by_customer::<OrderDatabase>(customer.id, &pool).await?;
    let mut body = serde_json::to_value(&customer)?;
    body["orders"] = serde_json::to_value(orders)?;
    Ok(HttpResponse::Ok().json(body))
}

#[tracing::instrument(name = "create_customer", skip(pool, _admin, body))]
pub async fn create_customer(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    body: web::Json<NewCustomer>,
) -> Result<HttpResponse> {
    let customer = Customer::new::<CustomerDatabase>(body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(customer))
}

#[tracing::instrument(name = "update_customer", skip(pool, _admin, body))]
pub async fn update_customer(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
    body: web::Json<CustomerUpdate>,
) -> Result<HttpResponse> {
    let customer =
        Customer::update::<CustomerDatabase>(id.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[tracing::instrument(name = "delete_customer", skip(pool, _admin))]
pub async fn delete_customer(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    Customer::delete::<CustomerDatabase>(id.into_inner(), &pool).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(name = "add_customer_review", skip(pool, admin, body))]
pub async fn add_customer_review(
    pool: web::Data<PgPool>,
    admin: AdminUser,
    id: web::Path<Uuid>,
    body: web::Json<NewReview>,
) -> Result<HttpResponse> {
    let customer = Customer::add_review::<CustomerDatabase>(
        id.into_inner(),
        body.into_inner(),
        Some(admin.0.name),
        &pool,
    )
    .await?;
    Ok(HttpResponse::Created().json(customer))
}
