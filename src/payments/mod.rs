pub mod events;
mod signature;
mod stripe;

pub use events::{CartLine, CheckoutSession, Event};
pub use signature::{sign_payload, SignatureError, WebhookVerifier};
pub use stripe::{
    CreatedSession, LineItem, PaymentError, PaymentProcessor, SessionRequest, StripeClient,
};
