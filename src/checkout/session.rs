use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

use crate::{
    models::{compute_total, OrderItem, DEFAULT_SHIPPING_COST, DEFAULT_SHIPPING_METHOD},
    payments::{events::metadata_keys, CartLine, LineItem, PaymentProcessor, SessionRequest},
    EmporiumError, Result,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub shipping_cost: Option<f64>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_info: CustomerInfo,
}

/// Fields are optional so a bad line is reported by position instead of
/// failing the whole body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

/// Rounds to the nearest minor unit, `2.499` becomes `250`
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn validate_items(items: &[CheckoutItem]) -> Result<Vec<CartLine>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let invalid = || {
                EmporiumError::BadRequest(format!(
                    "item {} must have a name, a non-negative price and a quantity of at least 1",
                    index
                ))
            };
            let name = item
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(invalid)?;
            let price = item
                .price
                .filter(|price| price.is_finite() && *price >= 0.0)
                .ok_or_else(invalid)?;
            let quantity = item.quantity.filter(|q| *q >= 1).ok_or_else(invalid)?;
            Ok(CartLine {
                name: name.to_string(),
                price,
                quantity,
                image: item.image.clone(),
            })
        })
        .collect()
}

fn insert_if_present(metadata: &mut BTreeMap<String, String>, key: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        metadata.insert(key.to_string(), value.to_string());
    }
}

/// Validates the cart and lays it out for the payment processor.
///
/// The buyer profile and a simplified copy of the cart travel in the session
/// metadata, that's all the webhook has to rebuild the order from.
pub fn build_session_request(
    request: &CheckoutRequest,
    frontend_url: &str,
) -> Result<SessionRequest> {
    if request.items.is_empty() {
        return Err(EmporiumError::BadRequest("cart is empty".to_string()));
    }
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| EmporiumError::BadRequest("email is required".to_string()))?;
    let cart = validate_items(&request.items)?;

    let shipping_cost = request.shipping_cost.unwrap_or(DEFAULT_SHIPPING_COST);
    if !shipping_cost.is_finite() || shipping_cost < 0.0 {
        return Err(EmporiumError::BadRequest(
            "shipping cost cannot be negative".to_string(),
        ));
    }
    let shipping_method = request
        .shipping_method
        .as_deref()
        .map(str::trim)
        .filter(|method| !method.is_empty())
        .unwrap_or(DEFAULT_SHIPPING_METHOD)
        .to_string();

    let mut line_items: Vec<LineItem> = cart
        .iter()
        .map(|line| LineItem {
            name: line.name.clone(),
            unit_amount: to_minor_units(line.price),
            quantity: line.quantity,
            image: line.image.clone(),
        })
        .collect();
    if to_minor_units(shipping_cost) > 0 {
        line_items.push(LineItem {
            name: format!("Shipping ({})", shipping_method),
            unit_amount: to_minor_units(shipping_cost),
            quantity: 1,
            image: None,
        });
    }

    let order_items: Vec<OrderItem> = cart
        .iter()
        .map(|line| OrderItem {
            name: line.name.clone(),
            price: line.price,
            quantity: line.quantity,
            image: line.image.clone(),
        })
        .collect();
    let total_amount = compute_total(&order_items, shipping_cost);

    let info = &request.customer_info;
    let mut metadata = BTreeMap::new();
    insert_if_present(&mut metadata, metadata_keys::FIRST_NAME, &info.first_name);
    insert_if_present(&mut metadata, metadata_keys::LAST_NAME, &info.last_name);
    insert_if_present(&mut metadata, metadata_keys::PHONE, &info.phone);
    insert_if_present(&mut metadata, metadata_keys::STREET, &info.street);
    insert_if_present(&mut metadata, metadata_keys::CITY, &info.city);
    insert_if_present(&mut metadata, metadata_keys::STATE, &info.state);
    insert_if_present(&mut metadata, metadata_keys::ZIP_CODE, &info.zip_code);
    insert_if_present(&mut metadata, metadata_keys::COUNTRY, &info.country);
    metadata.insert(metadata_keys::SHIPPING_METHOD.to_string(), shipping_method);
    metadata.insert(
        metadata_keys::SHIPPING_COST.to_string(),
        shipping_cost.to_string(),
    );
    metadata.insert(
        metadata_keys::TOTAL_AMOUNT.to_string(),
        total_amount.to_string(),
    );
    metadata.insert(
        metadata_keys::ITEMS.to_string(),
        serde_json::to_string(&cart)?,
    );

    let frontend_url = frontend_url.trim_end_matches('/');
    Ok(SessionRequest {
        line_items,
        customer_email: email.to_string(),
        metadata,
        success_url: format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            frontend_url
        ),
        cancel_url: format!("{}/cart", frontend_url),
    })
}

#[tracing::instrument(skip(processor, request))]
pub async fn create_checkout_session(
    processor: &dyn PaymentProcessor,
    request: &CheckoutRequest,
    frontend_url: &str,
) -> Result<CheckoutResponse> {
    let session_request = build_session_request(request, frontend_url)?;
    let session = processor
        .create_checkout_session(&session_request)
        .await
        .map_err(|e| {
            error!(err = %e, "failed to create checkout session");
            EmporiumError::PaymentProcessor(e.to_string())
        })?;
    Ok(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::assert_ok;
    use serde_json::json;

    use crate::test_helpers::FakePaymentProcessor;

    fn request(value: serde_json::Value) -> CheckoutRequest {
        serde_json::from_value(value).unwrap()
    }

    fn soap_cart() -> CheckoutRequest {
        request(json!({
            "items": [
                { "name": "Soap", "price": 10.0, "quantity": 2, "image": "https://img/soap.png" },
                { "name": "Balm", "price": 5.0, "quantity": 1 }
            ],
            "shippingCost": 3.5,
            "shippingMethod": "express",
            "email": "a@b.com",
            "customerInfo": { "firstName": "A", "lastName": "B", "zipCode": "N1" }
        }))
    }

    #[test]
    fn minor_units_round_to_nearest() {
        assert_eq!(to_minor_units(10.0), 1000);
        assert_eq!(to_minor_units(0.1 + 0.2), 30);
        assert_eq!(to_minor_units(2.499), 250);
        assert_eq!(to_minor_units(19.999), 2000);
    }

    #[test]
    fn empty_cart_or_missing_email_is_rejected() {
        let empty = request(json!({ "items": [], "email": "a@b.com" }));
        assert_eq!(
            build_session_request(&empty, "http://x").unwrap_err(),
            EmporiumError::BadRequest("cart is empty".into())
        );
        let no_email = request(json!({ "items": [{ "name": "Soap", "price": 1, "quantity": 1 }] }));
        assert_eq!(
            build_session_request(&no_email, "http://x").unwrap_err(),
            EmporiumError::BadRequest("email is required".into())
        );
    }

    #[test]
    fn first_invalid_item_is_reported() {
        let cart = request(json!({
            "items": [
                { "name": "Soap", "price": 1, "quantity": 1 },
                { "name": "Balm", "price": 1, "quantity": 0 },
                { "price": 1, "quantity": 1 }
            ],
            "email": "a@b.com"
        }));
        match build_session_request(&cart, "http://x").unwrap_err() {
            EmporiumError::BadRequest(message) => assert!(message.starts_with("item 1 ")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn builds_line_items_and_metadata() {
        let session = build_session_request(&soap_cart(), "http://localhost:3000/").unwrap();
        assert_eq!(session.line_items.len(), 3);
        assert_eq!(session.line_items[0].unit_amount, 1000);
        assert_eq!(session.line_items[1].unit_amount, 500);
        assert_eq!(session.line_items[2].name, "Shipping (express)");
        assert_eq!(session.line_items[2].unit_amount, 350);
        assert_eq!(session.customer_email, "a@b.com");
        assert_eq!(session.cancel_url, "http://localhost:3000/cart");

        let metadata = &session.metadata;
        assert_eq!(metadata["firstName"], "A");
        assert_eq!(metadata["zipCode"], "N1");
        assert!(!metadata.contains_key("phone"));
        assert_eq!(metadata["shippingMethod"], "express");
        assert_eq!(metadata["totalAmount"], "28.5");
        let items: Vec<CartLine> = serde_json::from_str(&metadata["items"]).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Soap");
        assert_eq!(items[0].image.as_deref(), Some("https://img/soap.png"));
    }

    #[test]
    fn free_shipping_adds_no_line() {
        let mut cart = soap_cart();
        cart.shipping_cost = None;
        let session = build_session_request(&cart, "http://x").unwrap();
        assert_eq!(session.line_items.len(), 2);
        assert_eq!(session.metadata["shippingCost"], "0");
    }

    #[tokio::test]
    async fn returns_the_processor_session() {
        let processor = FakePaymentProcessor::succeeding("cs_test_123");
        let response = create_checkout_session(&processor, &soap_cart(), "http://x").await;
        assert_ok!(&response);
        let response = response.unwrap();
        assert_eq!(response.session_id, "cs_test_123");
        assert_eq!(processor.requests().len(), 1);
    }

    #[tokio::test]
    async fn processor_failures_are_server_errors() {
        let processor = FakePaymentProcessor::failing();
        let response = create_checkout_session(&processor, &soap_cart(), "http://x").await;
        assert!(matches!(
            response.unwrap_err(),
            EmporiumError::PaymentProcessor(_)
        ));
    }
}
