use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::{self, token::random_hex, RESET_TOKEN_BYTES, RESET_TOKEN_DURATION_MINUTES},
    database::UserRepository,
    models::{normalize_email, user::validate_password},
    notifications::Notifier,
    EmporiumError, Result,
};

/// A freshly issued reset token. `raw` only ever leaves the process in the
/// email, `hash` is what gets stored.
#[derive(Debug, Clone)]
pub struct IssuedResetToken {
    pub raw: String,
    pub hash: String,
    pub expires: DateTime<Utc>,
}

pub fn issue_reset_token(now: DateTime<Utc>) -> IssuedResetToken {
    let raw = random_hex(RESET_TOKEN_BYTES);
    IssuedResetToken {
        hash: hash_reset_token(&raw),
        raw,
        expires: now + Duration::minutes(RESET_TOKEN_DURATION_MINUTES),
    }
}

pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Every failure maps to the same error, callers can't tell a wrong token
/// from an expired or used one.
pub fn check_reset_token(
    presented: &str,
    stored_hash: Option<&str>,
    expires: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<()> {
    let presented_hash = hash_reset_token(presented);
    match (stored_hash, expires) {
        (Some(stored_hash), Some(expires)) if stored_hash == presented_hash && expires > now => {
            Ok(())
        }
        _ => Err(EmporiumError::InvalidResetToken),
    }
}

pub fn reset_url(frontend_url: &str, raw_token: &str) -> String {
    format!(
        "{}/reset-password/{}",
        frontend_url.trim_end_matches('/'),
        raw_token
    )
}

/// Issues a reset token and emails the link.
///
/// Unknown emails succeed silently. When the email can't be sent the stored
/// token is cleared straight away, so a link nobody received never stays valid.
#[tracing::instrument(skip(email, notifier, pool))]
pub async fn request_password_reset<DB: UserRepository>(
    email: &str,
    notifier: &dyn Notifier,
    frontend_url: &str,
    pool: &PgPool,
) -> Result<()> {
    let user = match DB::find_by_email(&normalize_email(email), pool).await? {
        Some(user) => user,
        None => {
            info!("password reset requested for an unknown email");
            return Ok(());
        }
    };

    let issued = issue_reset_token(Utc::now());
    DB::set_reset_token(user.id, Some(&issued.hash), Some(issued.expires), pool).await?;

    let url = reset_url(frontend_url, &issued.raw);
    if let Err(e) = notifier
        .send_password_reset(&user.email, &user.name, &url)
        .await
    {
        warn!(err = %e, user_id = %user.id, "failed to send password reset email");
        DB::set_reset_token(user.id, None, None, pool).await?;
    }
    Ok(())
}

/// Swaps the password for the account holding the reset token. The token is
/// single use, and the account's bearer token is revoked along with it.
#[tracing::instrument(skip(raw_token, new_password, pool))]
pub async fn reset_password<DB: UserRepository>(
    raw_token: &str,
    new_password: &str,
    pool: &PgPool,
) -> Result<()> {
    let state = DB::find_by_reset_token(&hash_reset_token(raw_token), pool)
        .await?
        .ok_or(EmporiumError::InvalidResetToken)?;
    check_reset_token(
        raw_token,
        state.reset_password_token.as_deref(),
        state.reset_password_expires,
        Utc::now(),
    )?;
    validate_password(new_password)?;

    let password = new_password.to_string();
    let password_hash =
        tokio::task::spawn_blocking(move || auth::hash_password(&password)).await??;
    DB::update_password(state.id, &password_hash, pool).await
}
