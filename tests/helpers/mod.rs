#![allow(dead_code)]
mod app;
mod database;
mod fakes;

pub use app::{spawn_app, spawn_app_with_database, TestApp};
pub use database::configure_database;
pub use fakes::{RecordingNotifier, StubPayments};

use lazy_static::lazy_static;

use emporium::telemetry::{generate_subscriber, init_subscriber};

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";
pub const ADMIN_ADDRESS: &str = "admin@emporium.test";
pub const FRONTEND_URL: &str = "http://localhost:3000";

lazy_static! {
    /// Logs are swallowed unless the tests are run with `TEST_LOG=true`
    ///
    /// `TEST_LOG=true cargo test | bunyan`
    pub static ref TRACING: () = {
        if std::env::var("TEST_LOG").is_ok() {
            let subscriber = generate_subscriber("test".into(), "debug".into(), std::io::stdout);
            init_subscriber(subscriber);
        } else {
            let subscriber = generate_subscriber("test".into(), "debug".into(), std::io::sink);
            init_subscriber(subscriber);
        }
    };
}
