use actix_web::{web, HttpResponse};

use crate::{
    checkout::{self, CheckoutRequest},
    startup::Integrations,
    Result,
};

#[tracing::instrument(name = "create_checkout_session", skip(integrations, body))]
pub async fn create_session(
    integrations: web::Data<Integrations>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse> {
    let response = checkout::create_checkout_session(
        integrations.payments.as_ref(),
        &body,
        &integrations.frontend_url,
    )
    .await?;
    Ok(HttpResponse::Ok().json(response))
}
