use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    database::ProductDatabase,
    models::{NewProduct, NewReview, Product, ProductUpdate},
    Result,
};

#[tracing::instrument(name = "list_products", skip(pool))]
pub async fn list_products(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let products = Product::find_all::<ProductDatabase>(&pool).await?;
    Ok(HttpResponse::Ok().json(products))
}

#[tracing::instrument(name = "product_by_id", skip(pool))]
pub async fn product_by_id(pool: web::Data<PgPool>, id: web::Path<Uuid>) -> Result<HttpResponse> {
    let product = Product::find_by_id::<ProductDatabase>(id.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[tracing::instrument(name = "create_product", skip(pool, _admin, body))]
pub async fn create_product(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    body: web::Json<NewProduct>,
) -> Result<HttpResponse> {
    let product = Product::new::<ProductDatabase>(body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(product))
}

#[tracing::instrument(name = "update_product", skip(pool, _admin, body))]
pub async fn update_product(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
    body: web::Json<ProductUpdate>,
) -> Result<HttpResponse> {
    let product =
        Product::update::<ProductDatabase>(id.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[tracing::instrument(name = "delete_product", skip(pool, _admin))]
pub async fn delete_product(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    Product::delete::<ProductDatabase>(id.into_inner(), &pool).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(name = "add_product_review", skip(pool, user, body), fields(user_id = %user.0.id))]
pub async fn add_product_review(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    body: web::Json<NewReview>,
) -> Result<HttpResponse> {
    let product = Product::add_review::<ProductDatabase>(
        id.into_inner(),
        body.into_inner(),
        Some(user.0.name),
        &pool,
    )
    .await?;
    Ok(HttpResponse::Created().json(product))
}
