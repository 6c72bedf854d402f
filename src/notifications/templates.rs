//! Pure rendering of the transactional emails.
//!
//! Nothing here can fail: absent optional fields fall back to neutral labels
//! so a half-filled record never stops a message from going out.

use crate::models::{Customer, Order, OrderItem, UNKNOWN_CUSTOMER};

pub const NO_EMAIL_PROVIDED: &str = "no email provided";
pub const NOT_PROVIDED: &str = "not provided";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn or_fallback<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
}

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn short_id(order: &Order) -> String {
    order.id.simple().to_string()[..8].to_uppercase()
}

fn shipping_address(customer: &Customer) -> String {
    let parts: Vec<&str> = [
        customer.street.as_deref(),
        customer.city.as_deref(),
        customer.state.as_deref(),
        customer.zip_code.as_deref(),
        customer.country.as_deref(),
    ]
    .iter()
    .filter_map(|part| part.map(str::trim).filter(|part| !part.is_empty()))
    .collect();
    if parts.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        parts.join(", ")
    }
}

fn item_lines(items: &[OrderItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "- {} x{} @ {} = {}",
                or_fallback(Some(&item.name), "item"),
                item.quantity,
                money(item.price),
                money(item.subtotal())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn item_rows(items: &[OrderItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(or_fallback(Some(&item.name), "item")),
                item.quantity,
                money(item.price),
                money(item.subtotal())
            )
        })
        .collect::<Vec<_>>()
        .join("")
}

fn items_table(order: &Order) -> String {
    format!(
        "<table><thead><tr><th>Item</th><th>Qty</th><th>Price</th><th>Subtotal</th></tr></thead>\
         <tbody>{}</tbody></table>\
         <p>Shipping ({}): {}</p><p><strong>Total: {}</strong></p>",
        item_rows(&order.items),
        escape_html(&order.shipping_method),
        money(order.shipping_cost),
        money(order.total_amount)
    )
}

/// Sent to the buyer once their order is recorded
pub fn order_confirmation(customer: &Customer, order: &Order) -> RenderedEmail {
    let name = customer.display_name();
    let subject = format!("Order confirmation #{}", short_id(order));
    let text = format!(
        "Hi {name},\n\nThanks for your order! We're getting it ready.\n\n{items}\n\n\
         Shipping ({method}): {shipping}\nTotal: {total}\n\nShipping to: {address}\n",
        name = name,
        items = item_lines(&order.items),
        method = order.shipping_method,
        shipping = money(order.shipping_cost),
        total = money(order.total_amount),
        address = shipping_address(customer),
    );
    let html = format!(
        "<h1>Thanks for your order, {name}!</h1><p>We're getting it ready.</p>{table}\
         <p>Shipping to: {address}</p>",
        name = escape_html(&name),
        table = items_table(order),
        address = escape_html(&shipping_address(customer)),
    );
    RenderedEmail {
        subject,
        text,
        html,
    }
}

/// Sent to the store administrator for every new order
pub fn order_notification(customer: &Customer, order: &Order) -> RenderedEmail {
    let name = customer.display_name();
    let email = or_fallback(Some(&customer.email), NO_EMAIL_PROVIDED);
    let phone = or_fallback(customer.phone.as_deref(), NOT_PROVIDED);
    let subject = format!("New order #{} from {}", short_id(order), name);
    let text = format!(
        "New order received.\n\nOrder: {id}\nSession: {session}\nCustomer: {name}\n\
         Email: {email}\nPhone: {phone}\nAddress: {address}\n\n{items}\n\n\
         Shipping ({method}): {shipping}\nTotal: {total}\n",
        id = order.id,
        session = order.session_id,
        name = name,
        email = email,
        phone = phone,
        address = shipping_address(customer),
        items = item_lines(&order.items),
        method = order.shipping_method,
        shipping = money(order.shipping_cost),
        total = money(order.total_amount),
    );
    let html = format!(
        "<h1>New order received</h1><p>Order: {id}</p><p>Customer: {name}</p>\
         <p>Email: {email}</p><p>Phone: {phone}</p><p>Address: {address}</p>{table}",
        id = order.id,
        name = escape_html(&name),
        email = escape_html(email),
        phone = escape_html(phone),
        address = escape_html(&shipping_address(customer)),
        table = items_table(order),
    );
    RenderedEmail {
        subject,
        text,
        html,
    }
}

pub fn password_reset(name: &str, reset_url: &str, valid_for_minutes: i64) -> RenderedEmail {
    let name = or_fallback(Some(name), "there");
    let text = format!(
        "Hi {name},\n\nSomeone asked to reset the password on your account. \
         Follow the link below to choose a new one:\n\n{url}\n\n\
         The link expires in {minutes} minutes. If you didn't ask for this you can ignore this email.\n",
        name = name,
        url = reset_url,
        minutes = valid_for_minutes,
    );
    let html = format!(
        "<p>Hi {name},</p><p>Someone asked to reset the password on your account.</p>\
         <p><a href=\"{url}\">Choose a new password</a></p>\
         <p>The link expires in {minutes} minutes. If you didn't ask for this you can ignore this email.</p>",
        name = escape_html(name),
        url = escape_html(reset_url),
        minutes = valid_for_minutes,
    );
    RenderedEmail {
        subject: "Reset your password".to_string(),
        text,
        html,
    }
}
