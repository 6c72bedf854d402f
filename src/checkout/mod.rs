mod session;
mod webhook;

pub use session::{
    build_session_request, create_checkout_session, to_minor_units, CheckoutItem,
    CheckoutRequest, CheckoutResponse, CustomerInfo,
};
pub use webhook::{handle_event, process_webhook, IgnoreReason, WebhookContext, WebhookOutcome};
