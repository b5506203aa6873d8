use carbon_market_backend::{
    config::AppConfig,
    jobs::{
        auth_cleanup_job::start_auth_cleanup_job,
        performance_metrics_job::start_performance_metrics_job,
    },
    routes::create_router,
    services::{auth::AuthSettings, contract_gateway::ContractGateway},
    AppState,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,carbon_market_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    info!(env = %config.app_env, bind = %config.bind_addr, "Configuration loaded");

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let gateway = ContractGateway::connect(
        &config.ethereum_network_url,
        config.carbon_credit_address.as_str(),
        config.chain_tx_timeout,
    )
    .await?;

    let state = AppState::new(
        db.clone(),
        Arc::new(gateway),
        AuthSettings {
            nonce_ttl: config.nonce_ttl,
            session_ttl: config.session_ttl,
        },
    )
    .with_verbose_errors(!config.is_production());

    match config.metrics_interval {
        Some(period) => start_performance_metrics_job(db.clone(), period),
        None => info!("Performance metrics job disabled"),
    }
    match config.auth_cleanup_interval {
        Some(period) => start_auth_cleanup_job(db.clone(), period),
        None => info!("Auth cleanup job disabled"),
    }

    let app = create_router(state, &config.cors_allow_origin);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    // Router, state and the gateway's provider are dropped with `app`.
    db.close().await?;
    info!("Chain gateway released, database closed");
    Ok(())
}
