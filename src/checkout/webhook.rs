//! Turns a paid checkout session into a customer, an order and two emails.
//!
//! Only a failed signature check is ever reported back to the payment
//! processor as an error. Anything else, including our own persistence
//! failures, is acknowledged: a non-2xx makes the processor redeliver, and
//! redelivery of a half-processed event is worse than a logged failure.

use chrono::Utc;
use futures::future::join;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    database::{CustomerRepository, OrderRepository},
    models::{Customer, NewCustomer, NewOrder, Order, OrderItem},
    notifications::Notifier,
    payments::{events::metadata_keys, CartLine, Event, SignatureError, WebhookVerifier},
    EmporiumError,
};

/// Largest difference between the checkout total and the recomputed total
/// that isn't worth a warning
const TOTAL_MISMATCH_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnhandledEventType,
    NotPaid,
    MissingMetadata,
    InvalidEmail,
    MalformedPayload,
    MalformedCart,
    PersistenceFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    OrderCreated { order_id: Uuid, customer_id: Uuid },
    /// The session already produced an order, nothing further was done
    Duplicate { session_id: String },
    Ignored(IgnoreReason),
}

/// Everything the workflow talks to besides the database
pub struct WebhookContext<'a> {
    pub verifier: &'a WebhookVerifier,
    pub notifier: &'a dyn Notifier,
    pub admin_address: &'a str,
}

#[tracing::instrument(name = "process_webhook", skip_all)]
pub async fn process_webhook<C: CustomerRepository, O: OrderRepository>(
    payload: &[u8],
    signature: Option<&str>,
    context: &WebhookContext<'_>,
    pool: &PgPool,
) -> Result<WebhookOutcome, SignatureError> {
    context
        .verifier
        .verify(payload, signature, Utc::now().timestamp())?;

    let event: Event = match serde_json::from_slice(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(err = %e, "webhook payload could not be parsed");
            return Ok(WebhookOutcome::Ignored(IgnoreReason::MalformedPayload));
        }
    };
    Ok(handle_event::<C, O>(event, context, pool).await)
}

#[tracing::instrument(
    skip_all,
    fields(event_id = ?event.id, event_type = %event.event_type, session_id = %event.data.object.id)
)]
pub async fn handle_event<C: CustomerRepository, O: OrderRepository>(
    event: Event,
    context: &WebhookContext<'_>,
    pool: &PgPool,
) -> WebhookOutcome {
    if !event.is_checkout_completion() {
        info!("ignoring unhandled event type");
        return WebhookOutcome::Ignored(IgnoreReason::UnhandledEventType);
    }
    let session = event.data.object;
    if !session.is_paid() {
        info!(payment_status = ?session.payment_status, "checkout session is not paid");
        return WebhookOutcome::Ignored(IgnoreReason::NotPaid);
    }
    let metadata = match session.order_metadata() {
        Some(metadata) => metadata,
        None => {
            warn!("checkout session carries no order metadata");
            return WebhookOutcome::Ignored(IgnoreReason::MissingMetadata);
        }
    };
    let email = match session.buyer_email() {
        Some(email) => email,
        None => {
            warn!("checkout session carries no buyer email");
            return WebhookOutcome::Ignored(IgnoreReason::InvalidEmail);
        }
    };

    let customer =
        match Customer::find_or_create::<C>(customer_from_metadata(email, metadata), pool).await {
            Ok(customer) => customer,
            Err(EmporiumError::BadRequest(reason)) => {
                warn!(reason = %reason, "buyer email was rejected");
                return WebhookOutcome::Ignored(IgnoreReason::InvalidEmail);
            }
            Err(e) => {
                error!(err = ?e, "failed to upsert customer");
                return WebhookOutcome::Ignored(IgnoreReason::PersistenceFailure);
            }
        };

    let items = match parse_cart(metadata) {
        Ok(items) => items,
        Err(e) => {
            error!(err = %e, customer_id = %customer.id, "failed to parse cart from metadata");
            return WebhookOutcome::Ignored(IgnoreReason::MalformedCart);
        }
    };
    let new_order = NewOrder::from_paid_checkout(
        customer.id,
        session.id.clone(),
        items,
        metadata.get(metadata_keys::SHIPPING_METHOD).cloned(),
        parse_amount(metadata, metadata_keys::SHIPPING_COST),
    );
    if let Some(claimed) = parse_amount(metadata, metadata_keys::TOTAL_AMOUNT) {
        if (claimed - new_order.total_amount).abs() > TOTAL_MISMATCH_TOLERANCE {
            warn!(
                claimed,
                computed = new_order.total_amount,
                "checkout total differs from the recomputed order total"
            );
        }
    }

    let order = match Order::create_once::<O>(new_order, pool).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            info!("order already recorded for this session");
            return WebhookOutcome::Duplicate {
                session_id: session.id,
            };
        }
        Err(e) => {
            error!(err = ?e, customer_id = %customer.id, "failed to create order");
            return WebhookOutcome::Ignored(IgnoreReason::PersistenceFailure);
        }
    };
    info!(order_id = %order.id, customer_id = %customer.id, "order created and linked to customer");

    notify(context, &customer, &order).await;

    WebhookOutcome::OrderCreated {
        order_id: order.id,
        customer_id: customer.id,
    }
}

/// Both messages are attempted regardless of how the other one went
async fn notify(context: &WebhookContext<'_>, customer: &Customer, order: &Order) {
    let (buyer, admin) = join(
        context.notifier.send_order_confirmation(customer, order),
        context
            .notifier
            .send_order_notification(context.admin_address, customer, order),
    )
    .await;
    if let Err(e) = buyer {
        warn!(err = %e, order_id = %order.id, "failed to send order confirmation");
    }
    if let Err(e) = admin {
        warn!(err = %e, order_id = %order.id, "failed to send admin order notification");
    }
}

fn metadata_value(metadata: &HashMap<String, String>, key: &str) -> Option<String> {
    metadata
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_amount(metadata: &HashMap<String, String>, key: &str) -> Option<f64> {
    metadata_value(metadata, key)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
}

fn customer_from_metadata(email: &str, metadata: &HashMap<String, String>) -> NewCustomer {
    NewCustomer {
        first_name: metadata_value(metadata, metadata_keys::FIRST_NAME).unwrap_or_default(),
        last_name: metadata_value(metadata, metadata_keys::LAST_NAME).unwrap_or_default(),
        email: email.to_string(),
        phone: metadata_value(metadata, metadata_keys::PHONE),
        street: metadata_value(metadata, metadata_keys::STREET),
        city: metadata_value(metadata, metadata_keys::CITY),
        state: metadata_value(metadata, metadata_keys::STATE),
        zip_code: metadata_value(metadata, metadata_keys::ZIP_CODE),
        country: metadata_value(metadata, metadata_keys::COUNTRY),
    }
}

fn parse_cart(metadata: &HashMap<String, String>) -> Result<Vec<OrderItem>, serde_json::Error> {
    let raw = metadata
        .get(metadata_keys::ITEMS)
        .map(String::as_str)
        .unwrap_or("[]");
    let lines: Vec<CartLine> = serde_json::from_str(raw)?;
    Ok(lines
        .into_iter()
        .map(|line| OrderItem {
            name: line.name,
            price: line.price,
            quantity: line.quantity,
            image: line.image,
        })
        .collect())
}
