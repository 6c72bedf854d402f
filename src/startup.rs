use actix_cors::Cors;
use actix_web::{
    dev::Server,
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    web, App, HttpServer,
};
use reqwest::Url;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::Settings,
    notifications::{EmailError, EmailService, LogNotifier, Notifier},
    payments::{PaymentError, PaymentProcessor, SignatureError, StripeClient, WebhookVerifier},
    routes::*,
    EmporiumError,
};

/// Preflight responses are cached for an hour
const CORS_MAX_AGE_SECONDS: usize = 3600;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to configure email: {0}")]
    Email(#[from] EmailError),

    #[error("failed to configure payment processor: {0}")]
    Payment(#[from] PaymentError),

    #[error("failed to configure webhooks: {0}")]
    Webhook(#[from] SignatureError),
}

/// Clients for the outside services, built once and shared by every worker
#[derive(Clone)]
pub struct Integrations {
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub verifier: WebhookVerifier,
    pub admin_address: String,
    pub frontend_url: String,
    pub allow_local_origins: bool,
}

impl Integrations {
    pub fn from_settings(settings: &Settings) -> Result<Self, StartupError> {
        let notifier: Arc<dyn Notifier> = if settings.email.enabled {
            Arc::new(EmailService::new(&settings.email)?)
        } else {
            info!("email disabled, notifications will only be logged");
            Arc::new(LogNotifier)
        };
        Ok(Self {
            notifier,
            payments: Arc::new(StripeClient::new(&settings.payment)?),
            verifier: WebhookVerifier::from_settings(&settings.payment)?,
            admin_address: settings.email.admin_address.clone(),
            frontend_url: settings.application.frontend_url.clone(),
            allow_local_origins: settings.application.allow_local_origins,
        })
    }
}

/// The storefront's own origin always passes. Loopback origins on any port
/// pass only when `allow_local` is set.
fn origin_allowed(origin: &str, frontend_url: &str, allow_local: bool) -> bool {
    if origin == frontend_url.trim_end_matches('/') {
        return true;
    }
    if !allow_local {
        return false;
    }
    match Url::parse(origin) {
        Ok(url) => {
            url.scheme() == "http" && matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
        }
        Err(_) => false,
    }
}

fn cors(frontend_url: &str, allow_local: bool) -> Cors {
    let frontend_url = frontend_url.to_string();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            origin
                .to_str()
                .map(|origin| origin_allowed(origin, &frontend_url, allow_local))
                .unwrap_or(false)
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(&[AUTHORIZATION, CONTENT_TYPE])
        .max_age(Some(CORS_MAX_AGE_SECONDS))
}

/// Malformed JSON bodies answer with the same error shape as everything else
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| EmporiumError::BadRequest(err.to_string()).into())
}

pub fn build_app(
    listener: TcpListener,
    pool: PgPool,
    integrations: Integrations,
) -> Result<Server, std::io::Error> {
    let pool = web::Data::new(pool);
    let integrations = web::Data::new(integrations);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors(
                &integrations.frontend_url,
                integrations.allow_local_origins,
            ))
            .app_data(json_config())
            .app_data(pool.clone())
            .app_data(integrations.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/users")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(log_in))
                            .route("/logout", web::post().to(log_out))
                            .route("/me", web::get().to(me))
                            .route("/me/addresses", web::post().to(add_address))
                            .route("/me/addresses/{index}", web::delete().to(remove_address))
                            .route("/forgot-password", web::post().to(forgot_password))
                            .route("/reset-password/{token}", web::post().to(reset_password))
                            .service(web::resource(["", "/"]).route(web::get().to(list_users))),
                    )
                    .service(
                        web::scope("/products")
                            .service(
                                web::resource(["", "/"])
                                    .route(web::get().to(list_products))
                                    .route(web::post().to(create_product)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(product_by_id))
                                    .route(web::put().to(update_product))
                                    .route(web::delete().to(delete_product)),
                            )
                            .route("/{id}/reviews", web::post().to(add_product_review)),
                    )
                    .service(
                        web::scope("/customers")
                            .service(
                                web::resource(["", "/"])
                                    .route(web::get().to(list_customers))
                                    .route(web::post().to(create_customer)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(customer_by_id))
                                    .route(web::put().to(update_customer))
                                    .route(web::delete().to(delete_customer)),
                            )
                            .route("/{id}/reviews", web::post().to(add_customer_review)),
                    )
                    .service(
                        web::scope("/orders")
                            .service(web::resource(["", "/"]).route(web::get().to(list_orders)))
                            .route("/{id}", web::get().to(order_by_id))
                            .route("/{id}/status", web::put().to(change_order_status)),
                    )
                    .route("/checkout/create-session", web::post().to(create_session))
                    .route("/webhooks/stripe", web::post().to(stripe_webhook)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
