use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    database::{CustomerDatabase, OrderDatabase},
    models::{Order, StatusChange},
    routes::ExpandQuery,
    Result,
};

#[tracing::instrument(name = "list_orders", skip(pool, _admin))]
pub async fn list_orders(pool: web::Data<PgPool>, _admin: AdminUser) -> Result<HttpResponse> {
    let orders = Order::find_all::<OrderDatabase>(&pool).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[tracing::instrument(name = "order_by_id", skip(pool, _admin))]
pub async fn order_by_id(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
    query: web::Query<ExpandQuery>,
) -> Result<HttpResponse> {
    let mut order = Order::find_by_id::<OrderDatabase>(id.into_inner(), &pool).await?;
    if query.includes("customer") {
        order = order.expand_customer::<CustomerDatabase>(&pool).await?;
    }
    Ok(HttpResponse::Ok().json(order))
}

#[tracing::instrument(name = "change_order_status", skip(pool, admin, body), fields(admin_id = %admin.0.id))]
pub async fn change_order_status(
    pool: web::Data<PgPool>,
    admin: AdminUser,
    id: web::Path<Uuid>,
    body: web::Json<StatusChange>,
) -> Result<HttpResponse> {
    let order =
        Order::change_status::<OrderDatabase>(id.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(order))
}
