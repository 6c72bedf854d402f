use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
    auth::{self, generate_bearer_token, MIN_PASSWORD_LENGTH},
    database::UserRepository,
    models::normalize_email,
    EmporiumError, Result,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub zip_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The public view of an account. Credentials are never part of it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Only ever loaded to check a password during login
#[derive(Debug, sqlx::FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub password_hash: String,
    pub token: Option<String>,
}

/// Pending password reset, looked up by the hash of the emailed token
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResetState {
    pub id: Uuid,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqlxUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub addresses: Json<Vec<Address>>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl From<SqlxUser> for User {
    fn from(row: SqlxUser) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            addresses: row.addresses.0,
            created_at: row.created_at,
            last_modified: row.last_modified,
        }
    }
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[tracing::instrument(skip(pool), fields(model = "User"))]
    pub async fn find_all<DB: UserRepository>(pool: &PgPool) -> Result<Vec<Self>> {
        DB::find_all(pool).await
    }

    #[tracing::instrument(skip(pool, token), fields(model = "User"))]
    pub async fn find_by_token<DB: UserRepository>(token: &str, pool: &PgPool) -> Result<Self> {
        DB::find_by_token(token, pool).await
    }

    /// Creates the account and issues its bearer token
    #[tracing::instrument(skip(pool, registration), fields(model = "User"))]
    pub async fn register<DB: UserRepository>(
        registration: Registration,
        pool: &PgPool,
    ) -> Result<(Self, String)> {
        let email = normalize_email(&registration.email);
        if registration.name.trim().is_empty() {
            return Err(EmporiumError::BadRequest("name is required".to_string()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(EmporiumError::BadRequest(
                "a valid email is required".to_string(),
            ));
        }
        validate_password(&registration.password)?;

        let password = registration.password;
        let password_hash =
            tokio::task::spawn_blocking(move || auth::hash_password(&password)).await??;
        let new_user = NewUser {
            name: registration.name.trim().to_string(),
            email,
            password_hash,
            role: Role::User,
            token: generate_bearer_token(),
        };
        let user = DB::create(&new_user, pool).await?;
        Ok((user, new_user.token))
    }

    /// Checks the credentials and hands back the account's bearer token,
    /// issuing one if the account doesn't currently hold any
    #[tracing::instrument(skip(pool, email, password), fields(model = "User"))]
    pub async fn log_in<DB: UserRepository>(
        email: &str,
        password: &str,
        pool: &PgPool,
    ) -> Result<(Self, String)> {
        let credentials = DB::find_credentials(&normalize_email(email), pool)
            .await?
            .ok_or(EmporiumError::IncorrectCredentials)?;
        let password = password.to_string();
        let password_hash = credentials.password_hash;
        let matches =
            tokio::task::spawn_blocking(move || auth::verify_password(&password, &password_hash))
                .await??;
        if !matches {
            return Err(EmporiumError::IncorrectCredentials);
        }
        let token = match credentials.token {
            Some(token) => token,
            None => {
                let token = generate_bearer_token();
                DB::set_token(credentials.id, Some(&token), pool).await?;
                token
            }
        };
        let user = DB::find_by_id(credentials.id, pool).await?;
        Ok((user, token))
    }

    #[tracing::instrument(skip(pool), fields(model = "User"))]
    pub async fn log_out<DB: UserRepository>(id: Uuid, pool: &PgPool) -> Result<()> {
        DB::set_token(id, None, pool).await
    }

    #[tracing::instrument(skip(self, pool, address), fields(model = "User", id = %self.id))]
    pub async fn add_address<DB: UserRepository>(
        mut self,
        address: Address,
        pool: &PgPool,
    ) -> Result<Self> {
        push_address(&mut self.addresses, address);
        DB::set_addresses(self.id, &self.addresses, pool).await
    }

    #[tracing::instrument(skip(self, pool), fields(model = "User", id = %self.id))]
    pub async fn remove_address<DB: UserRepository>(
        mut self,
        index: usize,
        pool: &PgPool,
    ) -> Result<Self> {
        remove_address(&mut self.addresses, index)?;
        DB::set_addresses(self.id, &self.addresses, pool).await
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(EmporiumError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// At most one address is flagged as default. The first address always is.
pub fn push_address(addresses: &mut Vec<Address>, mut address: Address) {
    if addresses.is_empty() {
        address.is_default = true;
    }
    if address.is_default {
        addresses.iter_mut().for_each(|a| a.is_default = false);
    }
    addresses.push(address);
}

pub fn remove_address(addresses: &mut Vec<Address>, index: usize) -> Result<()> {
    if index >= addresses.len() {
        return Err(EmporiumError::NotFound);
    }
    let removed = addresses.remove(index);
    if removed.is_default {
        if let Some(first) = addresses.first_mut() {
            first.is_default = true;
        }
    }
    Ok(())
}
