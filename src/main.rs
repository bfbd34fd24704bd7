use anyhow::Result;

use digiurban::{app, config::Settings, db, logging};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    logging::init_logging(&settings.env);

    let records = db::open_store(&settings).await?;
    tracing::info!(
        storage = records.backend_name(),
        upload_dir = %settings.upload_dir.display(),
        "Starting DigiUrban backend"
    );

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    let router = app::create_app(app::AppState::new(records, settings));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, draining connections");
}
