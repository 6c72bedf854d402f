use async_trait::async_trait;
use std::sync::Mutex;

use emporium::{
    models::{Customer, Order},
    notifications::{EmailError, Notifier},
    payments::{CreatedSession, PaymentError, PaymentProcessor, SessionRequest},
};

/// Keeps the recipient of every message instead of sending it
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub confirmations: Mutex<Vec<String>>,
    pub admin_notifications: Mutex<Vec<String>>,
    pub password_resets: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_order_confirmation(
        &self,
        customer: &Customer,
        _order: &Order,
    ) -> Result<(), EmailError> {
        self.confirmations
            .lock()
            .unwrap()
            .push(customer.email.clone());
        Ok(())
    }

    async fn send_order_notification(
        &self,
        admin_address: &str,
        _customer: &Customer,
        _order: &Order,
    ) -> Result<(), EmailError> {
        self.admin_notifications
            .lock()
            .unwrap()
            .push(admin_address.to_string());
        Ok(())
    }

    async fn send_password_reset(
        &self,
        to: &str,
        _name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        self.password_resets
            .lock()
            .unwrap()
            .push((to.to_string(), reset_url.to_string()));
        Ok(())
    }
}

/// Answers every session request with the same id, or with a decline
#[derive(Debug)]
pub struct StubPayments {
    pub session_id: Option<String>,
    pub requests: Mutex<Vec<SessionRequest>>,
}

impl StubPayments {
    pub fn accepting(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn declining() -> Self {
        Self {
            session_id: None,
            requests: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl PaymentProcessor for StubPayments {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CreatedSession, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.session_id {
            Some(id) => Ok(CreatedSession {
                id: id.clone(),
                url: Some(format!("https://checkout.test/{}", id)),
            }),
            None => Err(PaymentError::Api {
                status: 402,
                message: "Your card was declined.".into(),
            }),
        }
    }
}
