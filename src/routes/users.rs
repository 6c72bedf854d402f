use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    auth::{self, AdminUser, AuthenticatedUser},
    database::UserDatabase,
    models::{Address, Registration, User},
    startup::Integrations,
    Result,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPassword {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPassword {
    pub password: String,
}

#[tracing::instrument(name = "register", skip(pool, body))]
pub async fn register(
    pool: web::Data<PgPool>,
    body: web::Json<Registration>,
) -> Result<HttpResponse> {
    let (user, token) = User::register::<UserDatabase>(body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(SessionResponse { user, token }))
}

#[tracing::instrument(name = "log_in", skip(pool, body))]
pub async fn log_in(pool: web::Data<PgPool>, body: web::Json<Credentials>) -> Result<HttpResponse> {
    let (user, token) = User::log_in::<UserDatabase>(&body.email, &body.password, &pool).await?;
    Ok(HttpResponse::Ok().json(SessionResponse { user, token }))
}

#[tracing::instrument(name = "log_out", skip(pool, user), fields(user_id = %user.0.id))]
pub async fn log_out(pool: web::Data<PgPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    User::log_out::<UserDatabase>(user.0.id, &pool).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0)
}

#[tracing::instrument(name = "add_address", skip(pool, user, address), fields(user_id = %user.0.id))]
pub async fn add_address(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    address: web::Json<Address>,
) -> Result<HttpResponse> {
    let user = user
        .0
        .add_address::<UserDatabase>(address.into_inner(), &pool)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[tracing::instrument(name = "remove_address", skip(pool, user), fields(user_id = %user.0.id))]
pub async fn remove_address(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    index: web::Path<usize>,
) -> Result<HttpResponse> {
    let user = user
        .0
        .remove_address::<UserDatabase>(index.into_inner(), &pool)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Responds the same way whether or not the email belongs to an account
#[tracing::instrument(name = "forgot_password", skip_all)]
pub async fn forgot_password(
    pool: web::Data<PgPool>,
    integrations: web::Data<Integrations>,
    body: web::Json<ForgotPassword>,
) -> Result<HttpResponse> {
    auth::request_password_reset::<UserDatabase>(
        &body.email,
        integrations.notifier.as_ref(),
        &integrations.frontend_url,
        &pool,
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

#[tracing::instrument(name = "reset_password", skip_all)]
pub async fn reset_password(
    pool: web::Data<PgPool>,
    token: web::Path<String>,
    body: web::Json<NewPassword>,
) -> Result<HttpResponse> {
    auth::reset_password::<UserDatabase>(&token, &body.password, &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password has been reset" })))
}

#[tracing::instrument(name = "list_users", skip(pool, _admin))]
pub async fn list_users(pool: web::Data<PgPool>, _admin: AdminUser) -> Result<HttpResponse> {
    let users = User::find_all::<UserDatabase>(&pool).await?;
    Ok(HttpResponse::Ok().json(users))
}
