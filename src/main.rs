use emporium::{
    build_app, get_configuration,
    telemetry::{generate_subscriber, init_subscriber},
    Integrations,
};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::time::Duration;
use tracing::info;

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = generate_subscriber("emporium".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration()?;

    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_with(configuration.database.with_db())
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let integrations = Integrations::from_settings(&configuration)?;

    let addr = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&addr)?;
    info!(%addr, "starting server");

    build_app(listener, pool.clone(), integrations)?.await?;

    info!("server stopped, closing database pool");
    pool.close().await;
    Ok(())
}
