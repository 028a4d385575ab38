use anyhow::Context;
use server::{build_router, config::Config, deployment::Deployment, init_tracing};
use services::services::maintenance::MaintenanceService;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }
    init_tracing();

    let config = Config::from_env()?;
    let deployment = Deployment::new(config.clone())
        .await
        .context("failed to open the database")?;

    MaintenanceService::spawn(
        deployment.db().clone(),
        deployment.storage().clone(),
        config.maintenance_interval,
        config.activity_retention_days,
    );

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(address = %config.bind_addr(), upload_dir = %config.upload_dir.display(), "Server listening");

    axum::serve(listener, build_router(deployment))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
