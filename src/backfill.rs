//! Links orders written before customers tracked their order ids.
//!
//! Safe to run repeatedly, ids already present are left alone.

use emporium::{
    database::CustomerDatabase,
    get_configuration,
    models::Customer,
    telemetry::{generate_subscriber, init_subscriber},
};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = generate_subscriber("emporium-backfill".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration()?;
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_with(configuration.database.with_db())
        .await?;

    let updated = Customer::link_missing_orders::<CustomerDatabase>(&pool).await?;
    info!(customers_updated = updated, "backfill complete");

    pool.close().await;
    Ok(())
}
