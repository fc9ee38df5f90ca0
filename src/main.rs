use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dentiplan::config::Config;
use dentiplan::modules::{health, payment_plans};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dentiplan=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting dentiplan payment-plan service");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool and apply migrations
    let db_pool = config.database.create_pool().await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let app_config = config.clone();
    let server = HttpServer::new(move || {
        // The clinic dashboard is served from a separate origin
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .configure(health::configure)
            .configure(payment_plans::configure)
    })
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await?;
    Ok(())
}
