mod email;
pub mod templates;

use async_trait::async_trait;
use lettre::transport::smtp::Error as SmtpError;
use thiserror::Error;
use tracing::info;

use crate::models::{Customer, Order};

pub use email::EmailService;
pub use templates::RenderedEmail;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Outbound transactional messages.
///
/// Every call is a single delivery attempt, failures are handed back to the
/// caller and never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_order_confirmation(
        &self,
        customer: &Customer,
        order: &Order,
    ) -> Result<(), EmailError>;

    async fn send_order_notification(
        &self,
        admin_address: &str,
        customer: &Customer,
        order: &Order,
    ) -> Result<(), EmailError>;

    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError>;
}

/// Stands in for SMTP when email is disabled. Only the recipient and subject
/// are logged, never a reset link.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_order_confirmation(
        &self,
        customer: &Customer,
        order: &Order,
    ) -> Result<(), EmailError> {
        let email = templates::order_confirmation(customer, order);
        info!(to = %customer.email, subject = %email.subject, "email disabled, skipping send");
        Ok(())
    }

    async fn send_order_notification(
        &self,
        admin_address: &str,
        customer: &Customer,
        order: &Order,
    ) -> Result<(), EmailError> {
        let email = templates::order_notification(customer, order);
        info!(to = %admin_address, subject = %email.subject, "email disabled, skipping send");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        to: &str,
        _name: &str,
        _reset_url: &str,
    ) -> Result<(), EmailError> {
        info!(to = %to, "email disabled, skipping password reset send");
        Ok(())
    }
}
