use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, types::Json, PgPool};
use uuid::Uuid;

use crate::{
    models::{user::SqlxUser, Address, AuthUser, NewUser, ResetState, User},
    Result,
};

/// Everything except the credential and reset columns
const USER_COLUMNS: &str = "id, name, email, role, addresses, created_at, last_modified";

#[async_trait]
pub trait UserRepository {
    async fn find_all(pool: &PgPool) -> Result<Vec<User>>;
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<User>;
    async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<User>>;
    async fn find_by_token(token: &str, pool: &PgPool) -> Result<User>;
    async fn find_credentials(email: &str, pool: &PgPool) -> Result<Option<AuthUser>>;
    async fn create(new_user: &NewUser, pool: &PgPool) -> Result<User>;
    async fn set_token(id: Uuid, token: Option<&str>, pool: &PgPool) -> Result<()>;
    async fn set_addresses(id: Uuid, addresses: &[Address], pool: &PgPool) -> Result<User>;
    async fn set_reset_token(
        id: Uuid,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
        pool: &PgPool,
    ) -> Result<()>;
    async fn find_by_reset_token(token_hash: &str, pool: &PgPool) -> Result<Option<ResetState>>;
    /// Stores the new hash and clears both the reset state and the bearer token
    async fn update_password(id: Uuid, password_hash: &str, pool: &PgPool) -> Result<()>;
}

pub struct UserDatabase;

#[async_trait]
impl UserRepository for UserDatabase {
    #[tracing::instrument(skip(pool), fields(repository = "user"))]
    async fn find_all(pool: &PgPool) -> Result<Vec<User>> {
        let users = query_as::<_, SqlxUser>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    #[tracing::instrument(skip(pool), fields(repository = "user"))]
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<User> {
        let user = query_as::<_, SqlxUser>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(user.into())
    }

    #[tracing::instrument(skip(pool, email), fields(repository = "user"))]
    async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<User>> {
        let user = query_as::<_, SqlxUser>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(user.map(User::from))
    }

    #[tracing::instrument(skip(pool, token), fields(repository = "user"))]
    async fn find_by_token(token: &str, pool: &PgPool) -> Result<User> {
        let user = query_as::<_, SqlxUser>(&format!(
            "SELECT {} FROM users WHERE token = $1",
            USER_COLUMNS
        ))
        .bind(token)
        .fetch_one(pool)
        .await?;
        Ok(user.into())
    }

    #[tracing::instrument(skip(pool, email), fields(repository = "user"))]
    async fn find_credentials(email: &str, pool: &PgPool) -> Result<Option<AuthUser>> {
        let credentials = query_as::<_, AuthUser>(
            r#"
            SELECT id, password_hash, token FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(credentials)
    }

    #[tracing::instrument(skip(pool, new_user), fields(repository = "user"))]
    async fn create(new_user: &NewUser, pool: &PgPool) -> Result<User> {
        let user = query_as::<_, SqlxUser>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .bind(&new_user.token)
        .fetch_one(pool)
        .await?;
        Ok(user.into())
    }

    #[tracing::instrument(skip(pool, token), fields(repository = "user"))]
    async fn set_token(id: Uuid, token: Option<&str>, pool: &PgPool) -> Result<()> {
        query("UPDATE users SET token = $2, last_modified = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(pool, addresses), fields(repository = "user"))]
    async fn set_addresses(id: Uuid, addresses: &[Address], pool: &PgPool) -> Result<User> {
        let user = query_as::<_, SqlxUser>(&format!(
            r#"
            UPDATE users SET addresses = $2, last_modified = now()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(Json(addresses))
        .fetch_one(pool)
        .await?;
        Ok(user.into())
    }

    #[tracing::instrument(skip(pool, token_hash), fields(repository = "user"))]
    async fn set_reset_token(
        id: Uuid,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
        pool: &PgPool,
    ) -> Result<()> {
        query(
            r#"
            UPDATE users
            SET reset_password_token = $2, reset_password_expires = $3, last_modified = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(pool, token_hash), fields(repository = "user"))]
    async fn find_by_reset_token(token_hash: &str, pool: &PgPool) -> Result<Option<ResetState>> {
        let state = query_as::<_, ResetState>(
            r#"
            SELECT id, reset_password_token, reset_password_expires
            FROM users WHERE reset_password_token = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;
        Ok(state)
    }

    #[tracing::instrument(skip(pool, password_hash), fields(repository = "user"))]
    async fn update_password(id: Uuid, password_hash: &str, pool: &PgPool) -> Result<()> {
        query(
            r#"
            UPDATE users SET
                password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires = NULL,
                token = NULL,
                last_modified = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(())
    }
}
