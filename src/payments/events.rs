use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED: &str =
    "checkout.session.async_payment_succeeded";
pub const PAID: &str = "paid";

/// Metadata keys written at checkout and read back by the webhook
pub mod metadata_keys {
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const PHONE: &str = "phone";
    pub const STREET: &str = "street";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const ZIP_CODE: &str = "zipCode";
    pub const COUNTRY: &str = "country";
    pub const SHIPPING_METHOD: &str = "shippingMethod";
    pub const SHIPPING_COST: &str = "shippingCost";
    pub const TOTAL_AMOUNT: &str = "totalAmount";
    pub const ITEMS: &str = "items";
}

/// The parts of a payment processor event this service reads
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: CheckoutSession,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// A cart line as packed into the session metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Event {
    pub fn is_checkout_completion(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
            || self.event_type == CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED
    }
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some(PAID)
    }

    /// `customer_email` when set, otherwise what the buyer typed on the
    /// hosted checkout page
    pub fn buyer_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| {
                self.customer_details
                    .as_ref()
                    .and_then(|details| details.email.as_deref())
            })
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Metadata is only usable when it carries the serialized cart
    pub fn order_metadata(&self) -> Option<&HashMap<String, String>> {
        self.metadata
            .as_ref()
            .filter(|metadata| metadata.contains_key(metadata_keys::ITEMS))
    }
}
