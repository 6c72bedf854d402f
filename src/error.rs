use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Postgres error code for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error, PartialEq)]
pub enum EmporiumError {
    #[error("Could not find resource")]
    NotFound,

    #[error("User is not authorized")]
    Unauthorized,

    #[error("Not authorized to request the specified resource")]
    Forbidden,

    #[error("Incorrect credentials provided")]
    IncorrectCredentials,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Invalid token provided")]
    InvalidToken(String),

    #[error("Invalid or expired token")]
    InvalidResetToken,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("A server error occurred")]
    DatabaseError,

    #[error("Internal Server Error")]
    ServerError(String),

    #[error("Payment processor error: {0}")]
    PaymentProcessor(String),

    #[error("Unexpected error occurred")]
    UnexpectedError,

    #[error("Provided data was malformed")]
    MalformedData,

    #[error("Unexpected error occurred")]
    CryptoError(#[from] argon2::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for EmporiumError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::IncorrectCredentials | Self::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::InvalidResetToken | Self::MalformedData => {
                StatusCode::BAD_REQUEST
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError
            | Self::ServerError(_)
            | Self::PaymentProcessor(_)
            | Self::UnexpectedError
            | Self::CryptoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(err = ?self, status = status.as_u16(), "responding with server error");
        }
        let error = match self {
            Self::BadRequest(details) | Self::InvalidToken(details) | Self::Conflict(details) => {
                details.clone()
            }
            // Internal details are logged above, never sent to the client
            Self::ServerError(_) | Self::CryptoError(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ErrorBody { error })
    }
}

impl From<sqlx::Error> for EmporiumError {
    fn from(e: sqlx::Error) -> EmporiumError {
        match e {
            sqlx::Error::RowNotFound => EmporiumError::NotFound,
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                warn!(err = ?e, "unique constraint violated");
                EmporiumError::Conflict("Resource already exists".to_string())
            }
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                warn!(err = ?e, "foreign key constraint violated");
                EmporiumError::Conflict("Resource is still referenced".to_string())
            }
            _ => {
                error!(err = ?e, "SQLx error occurred");
                EmporiumError::DatabaseError
            }
        }
    }
}

impl From<serde_json::Error> for EmporiumError {
    fn from(e: serde_json::Error) -> EmporiumError {
        use serde_json::error::Category::*;
        error!(err = ?e, "JSON Serde error occurred");

        match e.classify() {
            Syntax | Data | Eof => EmporiumError::MalformedData,
            Io => EmporiumError::UnexpectedError,
        }
    }
}

impl From<tokio::task::JoinError> for EmporiumError {
    fn from(e: tokio::task::JoinError) -> EmporiumError {
        error!(
            err = ?e,
            was_cancelled = e.is_cancelled(),
            did_panic = e.is_panic(),
            "Tokio task join error occurred"
        );
        EmporiumError::UnexpectedError
    }
}
