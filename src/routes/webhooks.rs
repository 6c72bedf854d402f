use actix_web::{web, HttpRequest, HttpResponse};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    checkout::{process_webhook, WebhookContext},
    database::{CustomerDatabase, OrderDatabase},
    startup::Integrations,
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Payment processor callback.
///
/// Reads the raw body so the signature is checked against the exact bytes that
/// were signed. Only a failed signature check is answered with a 400.
#[tracing::instrument(name = "stripe_webhook", skip_all)]
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    pool: web::Data<PgPool>,
    integrations: web::Data<Integrations>,
) -> HttpResponse {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let context = WebhookContext {
        verifier: &integrations.verifier,
        notifier: integrations.notifier.as_ref(),
        admin_address: &integrations.admin_address,
    };

    match process_webhook::<CustomerDatabase, OrderDatabase>(&body, signature, &context, &pool)
        .await
    {
        Ok(outcome) => {
            info!(?outcome, "webhook processed");
            HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body("Received")
        }
        Err(e) => {
            warn!(err = %e, "rejected webhook");
            HttpResponse::BadRequest()
                .content_type("text/plain; charset=utf-8")
                .body(format!("Webhook Error: {}", e))
        }
    }
}
