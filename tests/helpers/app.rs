use sqlx::{postgres::PgPoolOptions, PgPool};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use emporium::{build_app, payments::WebhookVerifier, Integrations};

use crate::helpers::{
    configure_database, RecordingNotifier, StubPayments, ADMIN_ADDRESS, FRONTEND_URL, TRACING,
    WEBHOOK_SECRET,
};

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub notifier: Arc<RecordingNotifier>,
    pub payments: Arc<StubPayments>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

fn integrations(notifier: Arc<RecordingNotifier>, payments: Arc<StubPayments>) -> Integrations {
    Integrations {
        notifier,
        payments,
        verifier: WebhookVerifier::Signed {
            secret: WEBHOOK_SECRET.to_string(),
            tolerance_seconds: 300,
        },
        admin_address: ADMIN_ADDRESS.to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        allow_local_origins: true,
    }
}

fn serve(pool: PgPool, payments: StubPayments) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let notifier = Arc::new(RecordingNotifier::default());
    let payments = Arc::new(payments);
    let server = build_app(
        listener,
        pool.clone(),
        integrations(Arc::clone(&notifier), Arc::clone(&payments)),
    )
    .expect("failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        db_pool: pool,
        notifier,
        payments,
    }
}

/// Serves the app against a pool that never connects.
///
/// Good for every route that's answered before touching the database.
pub async fn spawn_app(payments: StubPayments) -> TestApp {
    lazy_static::initialize(&TRACING);

    let configuration = emporium::get_configuration().expect("failed to read configuration");
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy_with(configuration.database.with_db());
    serve(pool, payments)
}

/// Serves the app against a throwaway database, needs a running Postgres
pub async fn spawn_app_with_database() -> TestApp {
    lazy_static::initialize(&TRACING);

    let mut configuration = emporium::get_configuration().expect("failed to read configuration");
    configuration.set_database_name(Uuid::new_v4().to_string());
    let pool = configure_database(&configuration.database).await;
    serve(pool, StubPayments::accepting("cs_test_database"))
}
