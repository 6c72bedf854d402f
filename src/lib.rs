pub mod auth;
pub mod checkout;
pub mod configuration;
pub mod database;
pub mod error;
pub mod models;
pub mod notifications;
pub mod payments;
pub mod routes;
pub mod startup;
pub mod telemetry;

#[cfg(test)]
mod test_helpers;

pub use configuration::get_configuration;
pub use error::EmporiumError;
pub use startup::{build_app, Integrations, StartupError};

pub type Result<T, E = EmporiumError> = std::result::Result<T, E>;
