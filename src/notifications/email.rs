use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    auth::RESET_TOKEN_DURATION_MINUTES,
    configuration::EmailSettings,
    models::{Customer, Order},
    notifications::{templates, EmailError, Notifier, RenderedEmail},
};

/// SMTP delivery of the transactional emails.
///
/// The transport pools its connections, so one instance is built at startup
/// and shared between workers.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    pub fn new(settings: &EmailSettings) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            settings.smtp_username.clone(),
            settings.smtp_password.clone(),
        );
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
            .port(settings.smtp_port)
            .credentials(credentials)
            .build();
        Ok(Self {
            mailer,
            from_address: settings.from_address.clone(),
        })
    }

    async fn send(&self, to: &str, email: RenderedEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )?;

        self.mailer.send(message).await?;
        tracing::info!(to = %to, subject = %email.subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailService {
    #[tracing::instrument(skip(self, customer, order), fields(order_id = %order.id))]
    async fn send_order_confirmation(
        &self,
        customer: &Customer,
        order: &Order,
    ) -> Result<(), EmailError> {
        let email = templates::order_confirmation(customer, order);
        self.send(&customer.email, email).await
    }

    #[tracing::instrument(skip(self, customer, order), fields(order_id = %order.id))]
    async fn send_order_notification(
        &self,
        admin_address: &str,
        customer: &Customer,
        order: &Order,
    ) -> Result<(), EmailError> {
        let email = templates::order_notification(customer, order);
        self.send(admin_address, email).await
    }

    #[tracing::instrument(skip(self, to, reset_url))]
    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let email = templates::password_reset(name, reset_url, RESET_TOKEN_DURATION_MINUTES);
        self.send(to, email).await
    }
}
